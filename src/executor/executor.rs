//! Query executor
//!
//! Validates a request, builds its statements and runs them in order on
//! the shared connection: the data statement first, then the paired count
//! on the scan path.

use std::sync::Arc;

use crate::observability::{Logger, MetricsRegistry, Timer};
use crate::query::{DocumentQuery, FieldAllowList, QueryLimits, QueryRequest, RetrievalKind};
use crate::statement::{RetrievalPath, StatementBuilder, StatementPlan};
use crate::store::Connection;

use super::errors::QueryResult;
use super::result::{PageData, PageMeta, QueryOutcome};
use super::shaper::{total_records, ResultShaper};

/// Runs validated queries against the document table
pub struct QueryExecutor {
    connection: Arc<Connection>,
    builder: StatementBuilder,
    allow_list: FieldAllowList,
    limits: QueryLimits,
    metrics: Arc<MetricsRegistry>,
}

impl QueryExecutor {
    pub fn new(
        connection: Arc<Connection>,
        builder: StatementBuilder,
        allow_list: FieldAllowList,
        limits: QueryLimits,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            connection,
            builder,
            allow_list,
            limits,
            metrics,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Validate and build statements without running them
    pub fn plan(
        &self,
        request: &QueryRequest,
        tenant: &str,
    ) -> QueryResult<(DocumentQuery, StatementPlan)> {
        let query = request.validate(&self.allow_list, &self.limits)?;
        let plan = self.builder.build(&query, tenant);
        Ok((query, plan))
    }

    /// Run a request for `tenant`
    pub async fn execute(&self, request: &QueryRequest, tenant: &str) -> QueryResult<QueryOutcome> {
        let timer = Timer::new();
        let doc_type = request.key.clone().unwrap_or_default();

        let (query, plan) = match self.plan(request, tenant) {
            Ok(planned) => planned,
            Err(err) => {
                self.metrics.increment_queries_rejected();
                Logger::warn(
                    "QUERY_REJECTED",
                    &[
                        ("tenant", tenant),
                        ("type", &doc_type),
                        ("code", err.code()),
                        ("reason", &err.to_string()),
                    ],
                );
                return Err(err);
            }
        };

        match self.run(&query, &plan).await {
            Ok(outcome) => {
                self.metrics.increment_queries_executed();
                Logger::info(
                    "QUERY_EXECUTED",
                    &[
                        ("tenant", tenant),
                        ("type", &query.doc_type),
                        ("path", plan.path.as_str()),
                        ("rows", &outcome.len().to_string()),
                        ("duration_ms", &timer.elapsed_ms()),
                    ],
                );
                Ok(outcome)
            }
            Err(err) => {
                self.metrics.increment_queries_failed();
                Logger::error(
                    "QUERY_FAILED",
                    &[
                        ("tenant", tenant),
                        ("type", &query.doc_type),
                        ("path", plan.path.as_str()),
                        ("code", err.code()),
                        ("reason", &err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }

    async fn run(&self, query: &DocumentQuery, plan: &StatementPlan) -> QueryResult<QueryOutcome> {
        let shaper = ResultShaper::new(query);
        let rows = self
            .connection
            .query(&plan.select.sql, &plan.select.params)
            .await?;

        let outcome = match plan.path {
            RetrievalPath::SingleId => QueryOutcome::Single(
                rows.first()
                    .map(|row| shaper.shape(row))
                    .unwrap_or_else(|| serde_json::json!({})),
            ),
            RetrievalPath::IdList => QueryOutcome::List(shaper.shape_all(&rows)),
            RetrievalPath::Scan => {
                let total = match &plan.count {
                    Some(count) => {
                        let count_rows = self.connection.query(&count.sql, &count.params).await?;
                        total_records(&count_rows)
                    }
                    None => rows.len() as i64,
                };

                let mut documents = shaper.shape_all(&rows);
                let data = if query.kind == RetrievalKind::Get && !documents.is_empty() {
                    PageData::One(documents.swap_remove(0))
                } else {
                    PageData::Many(documents)
                };

                QueryOutcome::Page {
                    data,
                    meta: PageMeta {
                        total_records: total,
                        limit: query.page.limit,
                        offset: query.page.offset,
                    },
                }
            }
        };

        Ok(outcome)
    }
}
