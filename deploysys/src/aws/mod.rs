pub(crate) mod appspec;
pub(crate) mod client;
pub(crate) mod deploy;
pub(crate) mod taskdef;
