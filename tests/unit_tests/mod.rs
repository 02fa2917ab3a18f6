mod error;
mod foundations;
mod matrices;
mod settings;
mod std_expansion;
