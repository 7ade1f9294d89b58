use std::sync::Arc;

use poll_promise::Promise;

/// Starts one background task per item, then waits for all of them.
///
/// Every task is spawned before the first one is awaited. Results come back in input
/// order regardless of completion order.
pub fn fan_out<T, R, F>(label: &str, items: Vec<T>, task: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let task = Arc::new(task);
    let promises: Vec<Promise<R>> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let task = Arc::clone(&task);
            Promise::spawn_thread(format!("{label}-{index}"), move || task(item))
        })
        .collect();

    promises.into_iter().map(Promise::block_and_take).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn results_keep_input_order() {
        let results = fan_out("order", vec![30u64, 0, 15], |delay| {
            std::thread::sleep(Duration::from_millis(delay));
            delay * 2
        });
        assert_eq!(results, vec![60, 0, 30]);
    }

    #[test]
    fn all_tasks_are_started_before_any_is_awaited() {
        // Each task waits for every sibling; this would deadlock if tasks ran one by one.
        let barrier = Arc::new(Barrier::new(3));
        let results = fan_out("barrier", vec![1, 2, 3], move |value| {
            barrier.wait();
            value
        });
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[test]
    fn empty_batches_complete_immediately() {
        let results: Vec<u8> = fan_out("empty", Vec::<u8>::new(), |value| value);
        assert!(results.is_empty());
    }
}
