//! Geolocation lookups for client keys.
//! The resolver is an external collaborator reached over HTTP; the request
//! path only ever sees its results through the geo cache.

mod client;

pub use client::{CountryResolver, IpApiResolver, IpApiResponse, UNKNOWN_COUNTRY};

#[cfg(test)]
pub use client::MockCountryResolver;
