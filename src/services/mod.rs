pub mod geoip;
pub mod query;

pub use geoip::{GeoCache, GeoIpProvider, GeoRecord, Resolution, ResolutionSource};
pub use query::{CsvExport, GeoLookupResponse, QueryService};
