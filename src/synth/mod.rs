// Purpose: FM voices, routing and polyphony
// This layer sits above graph nodes and turns a patch into sounding notes

pub mod factory;
pub mod message;
pub mod operators;
pub mod patch;
pub mod poly;
pub mod routing;
pub mod voice;
