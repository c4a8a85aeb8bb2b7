pub mod dataworks;
pub mod jdbc;
pub mod local;
pub mod output;
pub mod sdk;
