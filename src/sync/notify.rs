#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Partial(String),
    Failure(String),
}

/// Receives the single user-facing message emitted at the end of each pass.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Prints notices to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Success(msg) => println!("Synced {msg}"),
            Notice::Partial(msg) => println!("Synced with problems: {msg}"),
            Notice::Failure(msg) => eprintln!("Sync failed: {msg}"),
        }
    }
}
