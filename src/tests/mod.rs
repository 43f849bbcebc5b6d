pub mod support;

mod pipeline;
