/// History engine owning stacks, batches, and side effects.
pub mod engine;
/// Per-user and per-group realtime broadcast channels.
pub mod events;
/// Achievement evaluation boundary.
pub mod achieve;
