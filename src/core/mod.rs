pub mod export;
pub mod generator;
pub mod grammar;
pub mod markov;
pub mod render;
pub mod synth;
