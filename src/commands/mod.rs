// Plan, apply and destroy
pub mod lifecycle;

// Read-only inspection
pub mod inspect;
