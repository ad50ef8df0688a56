pub mod analysis;
pub mod breakeven;
pub mod models;
pub mod monte_carlo;
pub mod scenarios;
pub mod sensitivity;
