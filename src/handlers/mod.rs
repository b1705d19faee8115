// Two-tier handler layout: public (no auth) and protected (bearer JWT).
pub mod protected;
pub mod public;
