use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

/// Public mirror of the OpenFlights data directory.
pub const OPENFLIGHTS_BASE_URL: &str =
    "https://raw.githubusercontent.com/jpatokal/openflights/master/data";

/// The source extracts the loaders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Airlines,
    Airports,
    Routes,
    Aircraft,
}

impl Dataset {
    /// Load order used by the full pipeline.
    pub const ALL: [Dataset; 4] = [
        Dataset::Airlines,
        Dataset::Routes,
        Dataset::Airports,
        Dataset::Aircraft,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Dataset::Airlines => "airlines.dat",
            Dataset::Airports => "airports.dat",
            Dataset::Routes => "routes.dat",
            Dataset::Aircraft => "planes.dat",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Dataset::Airlines => "airlines",
            Dataset::Airports => "airports",
            Dataset::Routes => "airline_routes",
            Dataset::Aircraft => "aircraft",
        }
    }

    pub fn remote_url(self) -> String {
        format!("{}/{}", OPENFLIGHTS_BASE_URL, self.file_name())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dataset::Airlines => "airlines",
            Dataset::Airports => "airports",
            Dataset::Routes => "routes",
            Dataset::Aircraft => "aircraft",
        };
        f.write_str(name)
    }
}
