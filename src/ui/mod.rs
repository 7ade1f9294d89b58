pub mod app;
pub mod bulk_tag;
pub mod notifications;
pub mod repo_cards;
pub mod settings;
pub mod theme;

#[cfg(test)]
mod tests;
