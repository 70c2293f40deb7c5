use std::future::Future;

use crate::{
    db_types::{ListingSource, OrderId},
    traits::StoreError,
};

pub trait ListingStore: Clone + Send + Sync + 'static {
    /// Joins the maker's ownership of the listed token with the token and collection records. `None` if the order
    /// does not exist, or the maker holds no balance of the token, or the token is unknown.
    fn fetch_listing_source(
        &self,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<Option<ListingSource>, StoreError>> + Send;
}
