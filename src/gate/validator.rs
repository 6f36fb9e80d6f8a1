//! Pattern validation for plugin SQL
//!
//! Checks run in order: leading verb, referenced tables, then forbidden
//! keywords and stacked statements. Statements are tokenized with the
//! Postgres dialect, so comments never separate a clause from its table.
//! Every table list is walked across commas, aliases and joins. The DDL
//! keyword check reads the raw text, so keywords inside string literals
//! are refused too.

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::errors::{RawQueryError, RawQueryResult};

const ALLOWED_VERBS: [&str; 4] = ["SELECT", "INSERT", "UPDATE", "DELETE"];
const FORBIDDEN_VERBS: [&str; 6] = ["CREATE", "ALTER", "DROP", "TRUNCATE", "GRANT", "REVOKE"];

/// Keywords followed by a table list
const TABLE_CLAUSES: [&str; 6] = ["FROM", "JOIN", "USING", "INTO", "UPDATE", "TABLE"];

/// Keywords that end a table list
const LIST_TERMINATORS: [&str; 17] = [
    "WHERE", "GROUP", "HAVING", "WINDOW", "ORDER", "LIMIT", "OFFSET", "FETCH", "FOR", "UNION",
    "INTERSECT", "EXCEPT", "RETURNING", "SET", "VALUES", "DO", "SELECT",
];

/// Modifiers that may precede a list item
const ITEM_MODIFIERS: [&str; 2] = ["LATERAL", "ONLY"];

fn forbidden_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(create|alter|drop|truncate|grant|revoke)\b")
            .expect("forbidden keyword pattern compiles")
    })
}

/// Functions that run SQL text or dump relations named by string
fn forbidden_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\w+_to_xml(?:schema|_and_xmlschema)?|dblink\w*|ts_stat)$")
            .expect("forbidden function pattern compiles")
    })
}

/// Validates plugin statements against a single permitted table
#[derive(Debug, Clone)]
pub struct RawQueryValidator {
    allowed_table: String,
}

impl RawQueryValidator {
    pub fn new(allowed_table: impl Into<String>) -> Self {
        Self {
            allowed_table: allowed_table.into(),
        }
    }

    pub fn allowed_table(&self) -> &str {
        &self.allowed_table
    }

    pub fn validate(&self, sql: &str) -> RawQueryResult<()> {
        let tokens = tokenize(sql)?;
        self.check_verb(&tokens)?;
        self.check_tables(&tokens)?;
        self.check_forbidden(sql, &tokens)
    }

    fn check_verb(&self, tokens: &[Token]) -> RawQueryResult<()> {
        let verb = match tokens.first() {
            Some(token) => {
                keyword(token).ok_or_else(|| RawQueryError::VerbNotAllowed(token.to_string()))?
            }
            None => return Err(RawQueryError::VerbNotAllowed(String::new())),
        };

        if FORBIDDEN_VERBS.contains(&verb.as_str()) {
            return Err(RawQueryError::ForbiddenStatement(verb));
        }
        if !ALLOWED_VERBS.contains(&verb.as_str()) {
            return Err(RawQueryError::VerbNotAllowed(verb));
        }
        Ok(())
    }

    fn check_tables(&self, tokens: &[Token]) -> RawQueryResult<()> {
        let mut referenced = 0;
        for (index, token) in tokens.iter().enumerate() {
            let clause = match keyword(token) {
                Some(word) if TABLE_CLAUSES.contains(&word.as_str()) => word,
                _ => continue,
            };
            if is_value_clause(tokens, index, &clause) {
                continue;
            }

            // set-returning calls are items of FROM lists only
            let allow_functions = matches!(clause.as_str(), "FROM" | "JOIN" | "USING");
            for table in table_list(&tokens[index + 1..], allow_functions) {
                if !table.eq_ignore_ascii_case(&self.allowed_table) {
                    return Err(RawQueryError::TableNotAllowed(table));
                }
                referenced += 1;
            }
        }

        if referenced == 0 {
            return Err(RawQueryError::TableNotAllowed(
                "statement references no table".to_string(),
            ));
        }
        Ok(())
    }

    fn check_forbidden(&self, sql: &str, tokens: &[Token]) -> RawQueryResult<()> {
        if let Some(m) = forbidden_keyword().find(sql) {
            return Err(RawQueryError::ForbiddenStatement(m.as_str().to_ascii_uppercase()));
        }

        for token in tokens {
            if let Token::Word(word) = token {
                if forbidden_function().is_match(&word.value) {
                    return Err(RawQueryError::ForbiddenStatement(
                        word.value.to_ascii_uppercase(),
                    ));
                }
            }
        }

        // one trailing `;` is tolerated
        let last = tokens.len().saturating_sub(1);
        let stacked = tokens
            .iter()
            .enumerate()
            .any(|(i, token)| matches!(token, Token::SemiColon) && i != last);
        if stacked {
            return Err(RawQueryError::ForbiddenStatement(
                "multiple statements".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tokens without whitespace and comments
fn tokenize(sql: &str) -> RawQueryResult<Vec<Token>> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize().map_err(|e| {
        RawQueryError::ForbiddenStatement(format!("unreadable statement: {}", e))
    })?;

    Ok(tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
        .collect())
}

/// Upper-cased unquoted word
fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.value.to_ascii_uppercase()),
        _ => None,
    }
}

/// Clause keywords that introduce values rather than tables:
/// `DO UPDATE`, `FOR UPDATE`, `IS [NOT] DISTINCT FROM` and `EXTRACT(f FROM ..)`
fn is_value_clause(tokens: &[Token], index: usize, clause: &str) -> bool {
    let word_before = |n: usize| index.checked_sub(n).and_then(|i| keyword(&tokens[i]));

    match clause {
        "UPDATE" => matches!(word_before(1).as_deref(), Some("DO") | Some("FOR")),
        "FROM" => {
            let distinct = word_before(1).as_deref() == Some("DISTINCT")
                && matches!(word_before(2).as_deref(), Some("IS") | Some("NOT"));
            let extract = word_before(3).as_deref() == Some("EXTRACT")
                && matches!(index.checked_sub(2).map(|i| &tokens[i]), Some(Token::LParen));
            distinct || extract
        }
        _ => false,
    }
}

/// Table names of the list starting at `tokens[0]`
///
/// Items are separated by commas at the list's own nesting level. The list
/// ends at a terminating keyword, a `;`, or the parenthesis that closes it.
fn table_list(tokens: &[Token], allow_functions: bool) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut expect_item = true;
    let mut index = 0;

    while index < tokens.len() {
        if depth == 0 && expect_item {
            expect_item = false;
            while tokens
                .get(index)
                .and_then(keyword)
                .is_some_and(|word| ITEM_MODIFIERS.contains(&word.as_str()))
            {
                index += 1;
            }

            if let Some((name, next)) = qualified_name(tokens, index) {
                let is_call = matches!(tokens.get(next), Some(Token::LParen));
                if !(allow_functions && is_call) {
                    names.push(name);
                }
                index = next;
                continue;
            }
        }

        let Some(token) = tokens.get(index) else {
            break;
        };
        if depth == 0 {
            match token {
                Token::Comma => expect_item = true,
                Token::SemiColon => break,
                _ if keyword(token)
                    .is_some_and(|word| LIST_TERMINATORS.contains(&word.as_str())) =>
                {
                    break
                }
                _ => {}
            }
        }

        match token {
            Token::LParen | Token::LBracket => depth += 1,
            Token::RParen | Token::RBracket => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
        index += 1;
    }

    names
}

/// Dotted name starting at `start`, with the index just past it
fn qualified_name(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let mut parts = Vec::new();
    let mut index = start;

    while let Some(Token::Word(word)) = tokens.get(index) {
        parts.push(word.value.clone());
        index += 1;
        if !matches!(tokens.get(index), Some(Token::Period)) {
            break;
        }
        index += 1;
    }

    if parts.is_empty() {
        None
    } else {
        Some((parts.join("."), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> RawQueryValidator {
        RawQueryValidator::new("data")
    }

    fn rejects_table(sql: &str, table: &str) {
        match validator().validate(sql) {
            Err(RawQueryError::TableNotAllowed(t)) => assert_eq!(t, table, "{sql}"),
            other => panic!("{sql}: expected TableNotAllowed, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_scoped_select() {
        assert!(validator().validate("SELECT * FROM data WHERE sid=$1").is_ok());
        assert!(validator().validate("  select id from data where sid = $1;").is_ok());
    }

    #[test]
    fn test_accepts_writes_on_permitted_table() {
        let v = validator();
        assert!(v
            .validate("INSERT INTO data (id, ref, sid, document) VALUES ($1, $2, $3, $4)")
            .is_ok());
        assert!(v.validate("UPDATE data SET document = $1 WHERE id = $2").is_ok());
        assert!(v.validate("DELETE FROM data WHERE id = $1").is_ok());
        assert!(v
            .validate("UPDATE data SET document = $1, ref = $2 WHERE id = $3 RETURNING id, sid")
            .is_ok());
    }

    #[test]
    fn test_upsert_and_locking_clauses() {
        let v = validator();
        assert!(v
            .validate(
                "INSERT INTO data (id, document) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document"
            )
            .is_ok());
        assert!(v.validate("SELECT id FROM data WHERE sid = $1 FOR UPDATE").is_ok());
    }

    #[test]
    fn test_accepts_aliases_joins_and_functions() {
        let v = validator();
        assert!(v
            .validate("SELECT d.id FROM data AS d, data e WHERE d.id = e.id")
            .is_ok());
        assert!(v
            .validate(
                "SELECT item FROM data \
                 CROSS JOIN LATERAL jsonb_array_elements(document -> 'items') item \
                 WHERE sid = $1"
            )
            .is_ok());
        assert!(v
            .validate("SELECT id FROM data WHERE sid = $1 ORDER BY id, ref LIMIT 10")
            .is_ok());
        assert!(v
            .validate("SELECT id /* tenant rows */ FROM data WHERE ref IS DISTINCT FROM $1")
            .is_ok());
    }

    #[test]
    fn test_drop_is_forbidden() {
        assert!(matches!(
            validator().validate("DROP TABLE data"),
            Err(RawQueryError::ForbiddenStatement(_))
        ));
        assert!(matches!(
            validator().validate("grant all on data to public"),
            Err(RawQueryError::ForbiddenStatement(_))
        ));
        assert!(matches!(
            validator().validate("/* maintenance */ DROP TABLE data"),
            Err(RawQueryError::ForbiddenStatement(_))
        ));
    }

    #[test]
    fn test_other_verbs_not_allowed() {
        for sql in ["WITH x AS (SELECT 1) SELECT * FROM data", "COPY data TO STDOUT", "", "(SELECT 1)"] {
            assert!(
                matches!(validator().validate(sql), Err(RawQueryError::VerbNotAllowed(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_foreign_table_not_allowed() {
        rejects_table("SELECT * FROM users", "users");
        rejects_table(
            "SELECT * FROM data JOIN api_keys ON data.sid = api_keys.sid",
            "api_keys",
        );
        assert!(matches!(
            validator().validate("SELECT 1"),
            Err(RawQueryError::TableNotAllowed(_))
        ));
    }

    #[test]
    fn test_every_listed_table_is_checked() {
        rejects_table("SELECT * FROM data, api_keys", "api_keys");
        rejects_table("SELECT * FROM data d, api_keys k WHERE d.sid = k.sid", "api_keys");
        rejects_table("SELECT * FROM (SELECT id FROM data) s, api_keys", "api_keys");
        rejects_table(
            "SELECT * FROM data d JOIN data e ON d.id = e.id, api_keys",
            "api_keys",
        );
        rejects_table("SELECT * FROM ONLY api_keys", "api_keys");
        rejects_table("SELECT * FROM data, public.data", "public.data");
    }

    #[test]
    fn test_delete_using_is_checked() {
        rejects_table(
            "DELETE FROM data USING api_keys WHERE data.sid = api_keys.sid",
            "api_keys",
        );
        rejects_table("UPDATE data SET document = $1 FROM api_keys", "api_keys");
    }

    #[test]
    fn test_comments_do_not_hide_tables() {
        rejects_table(
            "SELECT * FROM data WHERE id IN (SELECT token FROM/**/api_keys)",
            "api_keys",
        );
        rejects_table("SELECT * FROM data, -- note\napi_keys", "api_keys");
        rejects_table("SELECT * FROM data WHERE id IN (TABLE api_keys)", "api_keys");
    }

    #[test]
    fn test_query_text_functions_forbidden() {
        assert!(matches!(
            validator().validate(
                "SELECT query_to_xml('SELECT token FROM ' || 'api_keys', true, true, '') FROM data"
            ),
            Err(RawQueryError::ForbiddenStatement(f)) if f == "QUERY_TO_XML"
        ));
        assert!(matches!(
            validator().validate("SELECT table_to_xml('api_keys', true, true, '') FROM data"),
            Err(RawQueryError::ForbiddenStatement(_))
        ));
    }

    #[test]
    fn test_quoted_table_name() {
        assert!(validator().validate(r#"SELECT * FROM "data" WHERE sid = $1"#).is_ok());
        rejects_table(r#"SELECT * FROM data,"api_keys""#, "api_keys");
    }

    #[test]
    fn test_embedded_ddl_and_stacked_statements() {
        assert!(matches!(
            validator().validate("SELECT * FROM data; DELETE FROM data"),
            Err(RawQueryError::ForbiddenStatement(_))
        ));
        assert!(matches!(
            validator().validate("DELETE FROM data WHERE id IN (SELECT id FROM data) AND 'x' = 'drop'"),
            Err(RawQueryError::ForbiddenStatement(k)) if k == "DROP"
        ));
        assert!(validator().validate("SELECT id FROM data WHERE document::text LIKE '%;%'").is_ok());
    }
}
