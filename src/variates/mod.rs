// Random-variate model: stateless draws for users, items and topic priors.
// Every function borrows the caller's generator.

pub mod beta;
pub mod simplex;
pub mod stoch;

pub use beta::*;
pub use simplex::*;
pub use stoch::*;
