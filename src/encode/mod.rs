pub(crate) mod command;
pub(crate) mod orchestrator;
pub(crate) mod probe;
pub(crate) mod tier;
