pub mod dispatcher;
pub mod queue;
