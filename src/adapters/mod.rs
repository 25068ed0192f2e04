// Adapters layer: concrete collaborators (remote validation, existing-set storage).

pub mod http_validator;
pub mod registry;
