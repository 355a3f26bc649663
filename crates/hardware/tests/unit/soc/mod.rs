/// System bring-up order, wiring, and shutdown.
pub mod builder;
