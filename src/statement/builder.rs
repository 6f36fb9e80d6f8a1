//! # Statement Builder
//!
//! Deterministic translation of a [`DocumentQuery`] into parameterized
//! SELECT and COUNT statements. The parameter list always starts with
//! `[type, tenant]` and the WHERE clause always starts with
//! `ref = $1 AND sid = $2`. Requester values only ever appear as bound
//! parameters; clause text is assembled from validated field paths and
//! the closed relation vocabulary.

use serde_json::{json, Value};

use crate::query::{
    Aggregate, AggregateKind, CompareAs, DocumentQuery, FieldPath, FieldSelection, IdSelector,
    Operand, Predicate, Projection, RetrievalKind, SortTarget, Term,
};
use crate::store::SqlParam;

use super::binder::Binder;
use super::path::{alias, escape_like, json_path, text_path};

/// Which retrieval path a query takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalPath {
    /// One id with `type:"get"`: at most one row
    SingleId,
    /// Id list, or one id with `type:"find"`
    IdList,
    /// No ids: data plus paired count
    Scan,
}

impl RetrievalPath {
    pub fn for_query(query: &DocumentQuery) -> Self {
        match (&query.ids, query.kind) {
            (Some(IdSelector::Single(_)), RetrievalKind::Get) => RetrievalPath::SingleId,
            (Some(_), _) => RetrievalPath::IdList,
            (None, _) => RetrievalPath::Scan,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalPath::SingleId => "single_id",
            RetrievalPath::IdList => "id_list",
            RetrievalPath::Scan => "scan",
        }
    }
}

/// Statement text with its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    pub fn to_json(&self) -> Value {
        json!({
            "sql": self.sql,
            "params": self.params.iter().map(SqlParam::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Everything needed to execute one query
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPlan {
    pub path: RetrievalPath,
    pub select: Statement,
    /// Present on the scan path only
    pub count: Option<Statement>,
}

impl StatementPlan {
    /// Plan rendered for `explain`
    pub fn to_json(&self) -> Value {
        json!({
            "path": self.path.as_str(),
            "select": self.select.to_json(),
            "count": self.count.as_ref().map(Statement::to_json),
        })
    }
}

/// Builds statements against one document table
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
}

impl StatementBuilder {
    /// `table` must already be validated as an identifier
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Build the plan for a validated query scoped to `tenant`
    pub fn build(&self, query: &DocumentQuery, tenant: &str) -> StatementPlan {
        let path = RetrievalPath::for_query(query);
        let mut binder = Binder::new();

        let select_list = select_list(query);
        let mut where_clause = scope_clause(&mut binder, &query.doc_type, tenant);

        match (&path, &query.ids) {
            (RetrievalPath::SingleId, Some(ids)) => {
                let placeholder = binder.bind_text(ids.ids()[0].clone());
                where_clause.push_str(&format!(" AND id = {}", placeholder));
            }
            (RetrievalPath::IdList, Some(ids)) => {
                let placeholders: Vec<String> =
                    ids.ids().iter().map(|id| binder.bind_text(id.clone())).collect();
                where_clause.push_str(&format!(" AND id IN ({})", placeholders.join(", ")));
            }
            _ => {}
        }

        where_clause.push_str(&filter_clause(&mut binder, query));

        let group_clause = group_clause(query);
        let order_clause = order_clause(query);
        let from_where = format!("FROM {} WHERE {}", self.table, where_clause);

        // The count statement reuses the WHERE values, bound before pagination
        let count = (path == RetrievalPath::Scan).then(|| {
            let sql = if group_clause.is_empty() {
                format!("SELECT COUNT(*)::text AS total {}", from_where)
            } else {
                format!(
                    "SELECT COUNT(*)::text AS total FROM (SELECT 1 {}{}) AS grouped",
                    from_where, group_clause
                )
            };
            Statement {
                sql,
                params: binder.snapshot(),
            }
        });

        let page_clause = match path {
            RetrievalPath::SingleId => " LIMIT 1".to_string(),
            _ => {
                let limit = binder.bind(SqlParam::Integer(query.page.limit));
                let offset = binder.bind(SqlParam::Integer(query.page.offset));
                format!(" LIMIT {} OFFSET {}", limit, offset)
            }
        };

        let sql = format!(
            "SELECT {} {}{}{}{}",
            select_list, from_where, group_clause, order_clause, page_clause
        );

        StatementPlan {
            path,
            select: Statement {
                sql,
                params: binder.into_params(),
            },
            count,
        }
    }
}

fn scope_clause(binder: &mut Binder, doc_type: &str, tenant: &str) -> String {
    let doc_type = binder.bind_text(doc_type);
    let tenant = binder.bind_text(tenant);
    format!("ref = {} AND sid = {}", doc_type, tenant)
}

fn select_list(query: &DocumentQuery) -> String {
    let mut columns = Vec::new();

    let explicit_id = query.selection.projections().contains(&Projection::Id);
    if query.includes_id() || explicit_id {
        columns.push(format!("id AS {}", alias("_id")));
    }

    match &query.selection {
        FieldSelection::Wildcard => {
            columns.push(format!("document::text AS {}", alias("document")));
        }
        FieldSelection::Fields(projections) => {
            for projection in projections {
                if let Projection::Path(field) = projection {
                    columns.push(format!(
                        "({})::text AS {}",
                        json_path(field),
                        alias(field.as_str())
                    ));
                }
            }
        }
    }

    for aggregate in &query.aggregates {
        columns.push(format!(
            "{}::text AS {}",
            aggregate_expr(aggregate),
            alias(&aggregate.alias())
        ));
    }

    columns.join(", ")
}

/// Aggregate expression without the text cast; non-numeric values sum as 0
fn aggregate_expr(aggregate: &Aggregate) -> String {
    match aggregate.kind {
        AggregateKind::Count => format!("COUNT({})", json_path(&aggregate.field)),
        AggregateKind::Sum => format!("SUM({})", numeric_value(&aggregate.field, "0")),
    }
}

/// Numeric cast that only runs on JSON numbers, other values yield `fallback`
fn numeric_value(field: &FieldPath, fallback: &str) -> String {
    format!(
        "CASE WHEN jsonb_typeof({}) = 'number' THEN ({})::numeric ELSE {} END",
        json_path(field),
        text_path(field),
        fallback
    )
}

fn filter_clause(binder: &mut Binder, query: &DocumentQuery) -> String {
    let mut clause = String::new();

    if let Some(search) = &query.search {
        let target = match &search.field {
            Some(field) => text_path(field),
            None => "document::text".to_string(),
        };
        let placeholder = binder.bind_text(format!("%{}%", escape_like(&search.needle)));
        clause.push_str(&format!(" AND {} ILIKE {}", target, placeholder));
    }

    if let Some(term) = &query.term {
        clause.push_str(&format!(" AND {}", term_expr(binder, term)));
    }

    clause
}

fn term_expr(binder: &mut Binder, term: &Term) -> String {
    let (relation, predicates) = term.parts();
    let parts: Vec<String> = predicates
        .iter()
        .map(|p| predicate_expr(binder, p))
        .collect();

    if parts.len() == 1 {
        parts.into_iter().next().unwrap_or_default()
    } else {
        format!("({})", parts.join(&format!(" {} ", relation.keyword())))
    }
}

fn predicate_expr(binder: &mut Binder, predicate: &Predicate) -> String {
    let lhs = match predicate.compare_as {
        CompareAs::Text => text_path(&predicate.field),
        CompareAs::Numeric => format!("({})", numeric_value(&predicate.field, "NULL")),
    };

    let mut rhs = |value: &str| -> String {
        let placeholder = binder.bind_text(value);
        match predicate.compare_as {
            CompareAs::Text => placeholder,
            CompareAs::Numeric => format!("({}::text)::numeric", placeholder),
        }
    };

    match &predicate.operand {
        Operand::Null => format!("{} IS NULL", lhs),
        Operand::NotNull => format!("{} IS NOT NULL", lhs),
        Operand::Scalar(value) => {
            format!("{} {} {}", lhs, predicate.relation.sql_operator(), rhs(value))
        }
        Operand::List(values) => {
            let placeholders: Vec<String> = values.iter().map(|v| rhs(v)).collect();
            format!("{} IN ({})", lhs, placeholders.join(", "))
        }
    }
}

fn group_clause(query: &DocumentQuery) -> String {
    if query.group_by.is_empty() {
        return String::new();
    }
    let exprs: Vec<String> = query.group_by.iter().map(json_path).collect();
    format!(" GROUP BY {}", exprs.join(", "))
}

fn order_clause(query: &DocumentQuery) -> String {
    if query.sort.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = query
        .sort
        .iter()
        .map(|key| {
            let expr = match &key.target {
                SortTarget::Path(field) => json_path(field),
                SortTarget::Aggregate(aggregate) => aggregate_expr(aggregate),
            };
            format!("{} {}", expr, key.order.keyword())
        })
        .collect();
    format!(" ORDER BY {}", keys.join(", "))
}
