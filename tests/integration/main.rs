//! Cross-crate scenarios driven through the [`licensehub::LicenseHub`] facade.

mod helpers;

mod auth_test;
mod license_test;
mod offline_test;
mod postgres_test;
