pub mod batch;

pub mod flatten;

pub mod item;

pub mod schema;

pub mod value;
