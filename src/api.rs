pub mod mindicador;
