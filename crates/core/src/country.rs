//! Country catalog and selector resolution.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Countries offered by the service, in menu order.
pub const DEFAULT_COUNTRIES: &[&str] = &[
	"Indonesia",
	"Kenya",
	"Vietnam",
	"Southafrica",
	"Canada",
	"Philippines",
	"Colombia",
	"Chile",
	"Laos",
	"Nigeria",
	"Egypt",
	"Ghana",
	"Cameroon",
];

/// How a caller names a country: catalog index or literal label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountrySelector {
	Index(usize),
	Name(String),
}

impl FromStr for CountrySelector {
	type Err = std::convert::Infallible;

	/// Digits parse as an index; anything else is taken as a literal label.
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(match s.trim().parse::<usize>() {
			Ok(index) => CountrySelector::Index(index),
			Err(_) => CountrySelector::Name(s.to_string()),
		})
	}
}

impl From<usize> for CountrySelector {
	fn from(index: usize) -> Self {
		CountrySelector::Index(index)
	}
}

impl From<&str> for CountrySelector {
	fn from(name: &str) -> Self {
		CountrySelector::Name(name.to_string())
	}
}

impl From<String> for CountrySelector {
	fn from(name: String) -> Self {
		CountrySelector::Name(name)
	}
}

impl fmt::Display for CountrySelector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CountrySelector::Index(index) => write!(f, "#{index}"),
			CountrySelector::Name(name) => f.write_str(name),
		}
	}
}

/// Fixed, ordered list of country labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryCatalog {
	names: Vec<String>,
}

impl Default for CountryCatalog {
	fn default() -> Self {
		Self::new(DEFAULT_COUNTRIES.iter().copied())
	}
}

impl CountryCatalog {
	pub fn new<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			names: names.into_iter().map(Into::into).collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&str> {
		self.names.get(index).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
		self.names.iter().map(String::as_str).enumerate()
	}

	/// Resolves `selector` to the label to click.
	///
	/// Indices must be in range; names are used literally, whitespace
	/// included, but must not be empty. Out-of-range indices never fall back to another entry.
	pub fn resolve(&self, selector: &CountrySelector) -> Result<String> {
		match selector {
			CountrySelector::Index(index) => self.get(*index).map(str::to_string).ok_or(Error::UnknownCountry {
				index: *index,
				len: self.len(),
			}),
			CountrySelector::Name(name) if name.is_empty() => Err(Error::InvalidCountry),
			CountrySelector::Name(name) => Ok(name.clone()),
		}
	}
}
