use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::{Slice, Window};

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

#[derive(Debug, Clone, Copy, Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 10000))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "ten")]
	pub size: i64,
}

impl Default for Paginate {
	fn default() -> Self {
		Self { page: 1, size: 10 }
	}
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		(self.page - 1) * self.size
	}

	pub fn limit(&self) -> i64 {
		self.size
	}

	pub fn window(&self) -> Window {
		Window {
			offset: self.offset(),
			limit: self.limit(),
		}
	}
}

/// One page of a larger, ordered result set.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
	pub content: Vec<T>,
	/// The page number (1-indexed).
	pub page: i64,
	pub size: i64,
	pub total_elements: i64,
	pub total_pages: i64,
}

impl<T> Page<T> {
	pub fn new(content: Vec<T>, paginate: Paginate, total_elements: i64) -> Self {
		Self {
			content,
			page: paginate.page,
			size: paginate.size,
			total_elements,
			total_pages: (total_elements + paginate.size - 1) / paginate.size,
		}
	}

	/// Builds a page from a store slice, converting every row.
	pub fn from_slice<R>(slice: Slice<R>, paginate: Paginate, f: impl FnMut(R) -> T) -> Self {
		Self::new(slice.items.into_iter().map(f).collect(), paginate, slice.total)
	}
}

/// A path made of a single numeric id.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	#[validate(range(min = 1))]
	pub id: i64,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostIdInput {
	#[validate(range(min = 1))]
	pub post_id: i64,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIdInput {
	#[validate(range(min = 1))]
	pub category_id: i64,
}

/// The id of a created or updated resource.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Id {
	pub id: i64,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_paginate_offset() {
		let mut paginate = Paginate { page: 1, size: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.size = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.window(), Window { offset: 10, limit: 5 });
	}

	#[test]
	fn test_total_pages_rounds_up() {
		let paginate = Paginate { page: 1, size: 10 };

		assert_eq!(Page::<()>::new(Vec::new(), paginate, 0).total_pages, 0);
		assert_eq!(Page::<()>::new(Vec::new(), paginate, 10).total_pages, 1);
		assert_eq!(Page::<()>::new(Vec::new(), paginate, 11).total_pages, 2);
	}
}
