//! Phone-side dispatch: watch events to host actions, host notifications to
//! watch commands.

mod dispatcher;
mod media;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use media::{Alerter, AudioController, MediaKey};
