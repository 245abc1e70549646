//! Paginated message listing
//!
//! Two statements share one filter: an exact count and the page itself,
//! newest first. They are not run in a transaction, so a concurrent harvest
//! can make the total and the page disagree slightly.

use crate::query::builder::{Ident, Order, Predicate, Select};
use crate::query::conditions::BasicConditions;
use crate::query::error::QueryResult;
use crate::query::executor::{scope_filter, QueryExecutor, RangeEnd};
use crate::query::params::{Pagination, QueryParameters};
use crate::query::results::{MessagePage, MessageRecord, MESSAGE_COLUMNS};
use crate::query::series::Series;

impl QueryExecutor {
    /// List messages for a territory, filtered by `conditions`
    ///
    /// Always reads the `messages` series whatever `params.series()` says.
    pub async fn messages(
        &self,
        params: &QueryParameters,
        conditions: &BasicConditions,
    ) -> QueryResult<MessagePage> {
        let page = Pagination::of(params);

        if params.territory().is_empty() {
            return Ok(MessagePage {
                messages: Vec::new(),
                total: 0,
                limit: page.limit,
                skip: page.skip,
            });
        }

        let mut filters = scope_filter(params, RangeEnd::Inclusive);
        if !params.network().is_empty() {
            filters.push(Predicate::eq("network", params.network()));
        }
        filters.extend(conditions.predicates());

        let total = Select::count(Series::Messages).filter(&filters).build();
        let total = self.fetch_count(&total).await?;

        let mut listing = Select::columns(Series::Messages, MESSAGE_COLUMNS)
            .filter(&filters)
            .order_by(Order::Desc(Ident::trusted("time")))
            .limit(page.limit);
        if page.skip > 0 {
            listing = listing.offset(page.skip);
        }
        let messages: Vec<MessageRecord> = self.fetch_as(&listing.build()).await?;

        tracing::debug!(
            territory = params.territory(),
            total,
            returned = messages.len(),
            "Listed messages"
        );

        Ok(MessagePage {
            messages,
            total,
            limit: page.limit,
            skip: page.skip,
        })
    }
}
