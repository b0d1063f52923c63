// Module layout (Clean Architecture style)
// - bootstrap: configuration and service wiring
// - infrastructure: Postgres/blob storage/email/crypto adapters
// - presentation: HTTP handlers and routing
// - application: ports, use cases, access rules and notifications
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
