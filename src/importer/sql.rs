//! SQL DDL importer
//!
//! One implementation serves every SQL dialect token (Spanner, Postgres,
//! MySQL, BigQuery, and their directory variants). Only `CREATE TABLE`
//! statements produce types; everything else is skipped.

use regex::Regex;
use std::fmt;
use tracing::{debug, trace, warn};

use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::Format;
use crate::types::{BuiltinType, Field, SizeSpec, Type, TypeList, TypeRef};

/// SQL flavour, carried from the format token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Spanner,
    Postgres,
    MySql,
    BigQuery,
}

impl SqlDialect {
    pub fn from_format(format: &Format) -> Self {
        let name = format.name.to_ascii_lowercase();
        if name.starts_with("postgres") {
            SqlDialect::Postgres
        } else if name.starts_with("mysql") {
            SqlDialect::MySql
        } else if name.starts_with("bigquery") {
            SqlDialect::BigQuery
        } else {
            SqlDialect::Spanner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Spanner => "spanner",
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
            SqlDialect::BigQuery => "bigquery",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importer for SQL schema files
#[derive(Debug, Clone)]
pub struct SqlImporter {
    format: Format,
    dialect: SqlDialect,
    arg: ImporterArg,
}

impl SqlImporter {
    pub fn new(format: Format) -> Self {
        Self {
            dialect: SqlDialect::from_format(&format),
            format,
            arg: ImporterArg::default(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

impl Importer for SqlImporter {
    fn format(&self) -> Format {
        self.format
    }

    fn configure(&mut self, arg: &ImporterArg) -> Result<()> {
        self.arg = arg.clone();
        Ok(())
    }

    fn arg(&self) -> &ImporterArg {
        &self.arg
    }

    fn import(&self, content: &str) -> Result<TypeList> {
        let patterns = Patterns::new()?;
        let content = patterns.comment.replace_all(content, "");

        let mut types = TypeList::new();
        for statement in split_top_level(&content, ';') {
            match self.table(&patterns, statement)? {
                Some(table) => types.add([table]),
                None if !statement.trim().is_empty() => {
                    trace!(dialect = %self.dialect, "skipping non-table statement");
                }
                None => {}
            }
        }

        debug!(dialect = %self.dialect, tables = types.len(), "converted sql schema");
        types.sort_all()?;
        Ok(types)
    }
}

// =============================================================================
// Statement parsing
// =============================================================================

struct Patterns {
    comment: Regex,
    create_table: Regex,
    constraint: Regex,
    primary_key: Regex,
    foreign_key: Regex,
    references: Regex,
    interleave: Regex,
    column: Regex,
    column_type: Regex,
    not_null: Regex,
    inline_pk: Regex,
    auto_increment: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            comment: Regex::new(r"(?s)--[^\n]*|/\*.*?\*/")?,
            create_table: Regex::new(
                r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)\s*\(",
            )?,
            constraint: Regex::new(
                r"(?i)^(?:CONSTRAINT|PRIMARY\s+KEY|FOREIGN\s+KEY|UNIQUE|KEY|INDEX|CHECK|FULLTEXT)\b",
            )?,
            primary_key: Regex::new(r"(?is)PRIMARY\s+KEY\s*\(([^)]*)\)")?,
            foreign_key: Regex::new(
                r"(?is)FOREIGN\s+KEY\s*\(([^)]*)\)\s*REFERENCES\s+([^\s(]+)\s*\(([^)]*)\)",
            )?,
            references: Regex::new(r"(?is)\bREFERENCES\s+([^\s(]+)\s*(?:\(([^)]*)\))?")?,
            interleave: Regex::new(r"(?is)INTERLEAVE\s+IN\s+PARENT\s+([^\s,;]+)")?,
            column: Regex::new(r#"(?s)^([`"\[]?[^\s`"\]]+[`"\]]?)\s+(.*)$"#)?,
            column_type: Regex::new(
                r"(?i)^([a-z_][a-z0-9_]*(?:\s+(?:precision|varying|unsigned))?)\s*(?:\(\s*([^)]*?)\s*\))?\s*(\[\])?",
            )?,
            not_null: Regex::new(r"(?i)\bNOT\s+NULL\b")?,
            inline_pk: Regex::new(r"(?i)\bPRIMARY\s+KEY\b")?,
            auto_increment: Regex::new(r"(?i)\bAUTO_?INCREMENT\b")?,
        })
    }
}

impl SqlImporter {
    fn table(&self, p: &Patterns, statement: &str) -> Result<Option<Type>> {
        let Some(caps) = p.create_table.captures(statement) else {
            return Ok(None);
        };
        let name = ident(&caps[1]);
        let open = caps.get(0).map_or(0, |m| m.end() - 1);
        let close = matching_close(statement, open).ok_or_else(|| {
            ImportError::parse(self.format.name, format!("unterminated column list for table {name}"))
        })?;
        let body = &statement[open + 1..close];
        let tail = &statement[close + 1..];

        let mut primary: Vec<String> = Vec::new();
        let mut foreign: Vec<(String, String)> = Vec::new();
        let mut columns: Vec<Field> = Vec::new();

        for item in split_top_level(body, ',').into_iter().map(str::trim) {
            if item.is_empty() {
                continue;
            }
            if p.constraint.is_match(item) {
                if let Some(c) = p.primary_key.captures(item) {
                    primary.extend(idents(&c[1]));
                }
                if let Some(c) = p.foreign_key.captures(item) {
                    let target = ident(&c[2]);
                    for (column, target_column) in idents(&c[1]).zip(idents(&c[3])) {
                        foreign.push((column, format!("{target}.{target_column}")));
                    }
                }
                continue;
            }
            columns.push(self.column(p, &name, item)?);
        }

        if let Some(c) = p.primary_key.captures(tail) {
            primary.extend(idents(&c[1]));
        }

        for field in &mut columns {
            if primary.contains(&field.name) && !field.attrs.iter().any(|a| a == "~pk") {
                field.attrs.push("~pk".to_string());
                field.optional = false;
            }
            for (column, target) in &foreign {
                let attr = format!("~fk={target}");
                if *column == field.name && !field.attrs.contains(&attr) {
                    field.attrs.push(attr);
                }
            }
        }

        let mut attrs = vec![format!("~dialect={}", self.dialect)];
        if let Some(c) = p.interleave.captures(tail) {
            attrs.push(format!("~interleave={}", ident(&c[1])));
        }
        Ok(Some(Type::standard(name, columns.into()).with_attrs(attrs)))
    }

    fn column(&self, p: &Patterns, table: &str, item: &str) -> Result<Field> {
        let caps = p.column.captures(item).ok_or_else(|| {
            ImportError::parse(self.format.name, format!("cannot parse column of {table}: {item}"))
        })?;
        let name = ident(&caps[1]);
        let definition = caps.get(2).map_or("", |m| m.as_str());
        let (ty, size, rest) = parse_type(p, definition);

        let primary = p.inline_pk.is_match(rest);
        let optional = !(primary || p.not_null.is_match(rest));
        let mut field = Field::new(name, ty).with_optional(optional).with_size(size);
        if primary {
            field.attrs.push("~pk".to_string());
        }
        if p.auto_increment.is_match(rest) || is_serial(definition) {
            field.attrs.push("~autoinc".to_string());
        }
        if let Some(c) = p.references.captures(rest) {
            let target = ident(&c[1]);
            match c.get(2) {
                Some(column) => field.attrs.push(format!("~fk={target}.{}", ident(column.as_str()))),
                None => field.attrs.push(format!("~fk={target}")),
            }
        }
        Ok(field)
    }
}

/// Parse a column type, returning what follows it
fn parse_type<'t>(p: &Patterns, text: &'t str) -> (TypeRef, Option<SizeSpec>, &'t str) {
    let text = text.trim_start();

    for (prefix, is_array) in [("ARRAY<", true), ("STRUCT<", false)] {
        if starts_with_ignore_case(text, prefix) {
            let open = prefix.len() - 1;
            let Some(close) = matching_close(text, open) else {
                return (BuiltinType::Any.into(), None, "");
            };
            let rest = &text[close + 1..];
            if !is_array {
                return (BuiltinType::Any.into(), None, rest);
            }
            let (items, _, _) = parse_type(p, &text[open + 1..close]);
            return (TypeRef::inline(Type::array("", items)), None, rest);
        }
    }

    let Some(caps) = p.column_type.captures(text) else {
        return (BuiltinType::Any.into(), None, text);
    };
    let base = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
    let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
    let builtin = sql_builtin(&base).unwrap_or_else(|| {
        warn!(sql_type = %base, "unknown sql type, using any");
        BuiltinType::Any
    });

    if caps.get(3).is_some() {
        return (TypeRef::inline(Type::array("", builtin)), None, rest);
    }

    let size = match (builtin, caps.get(2)) {
        (BuiltinType::String | BuiltinType::Bytes, Some(arg)) => size_arg(arg.as_str()),
        _ => None,
    };
    (builtin.into(), size, rest)
}

/// `VARCHAR(50)` carries a single length; `STRING(MAX)` has no upper bound
fn size_arg(arg: &str) -> Option<SizeSpec> {
    if arg.eq_ignore_ascii_case("max") {
        return Some(SizeSpec::open_ended(0));
    }
    arg.split(',')
        .next()
        .and_then(|n| n.trim().parse::<i64>().ok())
        .map(SizeSpec::min_only)
}

fn sql_builtin(base: &str) -> Option<BuiltinType> {
    let builtin = match base {
        "bool" | "boolean" | "bit" => BuiltinType::Bool,
        "int64" | "bigint" | "int8" | "bigserial" => BuiltinType::Int64,
        "int" | "integer" | "int4" | "serial" | "mediumint" | "smallint" | "int2" | "tinyint"
        | "smallserial" | "int unsigned" => BuiltinType::Int32,
        "float64" | "double" | "double precision" | "float8" => BuiltinType::Float64,
        "float32" | "real" | "float4" => BuiltinType::Float32,
        "float" => BuiltinType::Float,
        "numeric" | "decimal" | "bignumeric" | "number" | "money" => BuiltinType::Decimal,
        "string" | "varchar" | "character varying" | "char" | "character" | "nchar" | "nvarchar"
        | "text" | "tinytext" | "mediumtext" | "longtext" | "json" | "jsonb" | "time" | "interval"
        | "enum" | "set" | "inet" | "cidr" => BuiltinType::String,
        "bytes" | "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary"
        | "varbinary" => BuiltinType::Bytes,
        "date" => BuiltinType::Date,
        "timestamp" | "timestamptz" | "datetime" => BuiltinType::Datetime,
        "uuid" => BuiltinType::Uuid,
        "xml" => BuiltinType::Xml,
        _ => return None,
    };
    Some(builtin)
}

fn is_serial(definition: &str) -> bool {
    let first = definition.split_whitespace().next().unwrap_or_default();
    ["serial", "bigserial", "smallserial"]
        .iter()
        .any(|s| first.eq_ignore_ascii_case(s))
}

// =============================================================================
// Lexical helpers
// =============================================================================

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

/// Strip identifier quoting and any schema/dataset qualifier
fn ident(raw: &str) -> String {
    let last = raw.trim().rsplit('.').next().unwrap_or(raw);
    last.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']')).to_string()
}

/// Column names of a key list such as `(a, b DESC)`
fn idents(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(ident)
}

/// Bracket and quote state while scanning DDL text.
///
/// `<` only opens after `ARRAY` or `STRUCT`; elsewhere it is a comparison
/// operator, as is any `>` that does not close such a bracket.
#[derive(Default)]
struct Nesting {
    quote: Option<char>,
    stack: Vec<char>,
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Quoted,
    Open,
    Close,
    Other,
}

impl Nesting {
    fn step(&mut self, text: &str, i: usize, c: char) -> Step {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return Step::Quoted;
        }
        match c {
            '\'' | '"' | '`' => {
                self.quote = Some(c);
                Step::Quoted
            }
            '(' => {
                self.stack.push('(');
                Step::Open
            }
            '<' if follows_type_keyword(&text[..i]) => {
                self.stack.push('<');
                Step::Open
            }
            ')' if self.stack.last() == Some(&'(') => {
                self.stack.pop();
                Step::Close
            }
            '>' if self.stack.last() == Some(&'<') => {
                self.stack.pop();
                Step::Close
            }
            _ => Step::Other,
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Whether `before` ends with a standalone `ARRAY` or `STRUCT` keyword
fn follows_type_keyword(before: &str) -> bool {
    let head = before.trim_end();
    ["ARRAY", "STRUCT"].iter().any(|keyword| {
        let Some(split) = head.len().checked_sub(keyword.len()) else {
            return false;
        };
        let (Some(prefix), Some(word)) = (head.get(..split), head.get(split..)) else {
            return false;
        };
        word.eq_ignore_ascii_case(keyword) && !prefix.ends_with(|c: char| c.is_alphanumeric() || c == '_')
    })
}

/// Split on `sep` outside brackets and quotes
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut nesting = Nesting::default();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if nesting.step(text, i, c) == Step::Other && c == sep && nesting.depth() == 0 {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Index of the bracket closing the one at `open`
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut nesting = Nesting::default();
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if nesting.step(text, i, c) == Step::Close && nesting.depth() == 0 {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BIGQUERY, MYSQL, POSTGRES, SPANNER_SQL};
    use crate::types::TypeKind;

    fn import(format: Format, content: &str) -> TypeList {
        SqlImporter::new(format).import(content).unwrap()
    }

    fn get<'a>(types: &'a TypeList, name: &str) -> &'a Type {
        types.get(types.position(name).unwrap()).unwrap()
    }

    #[test]
    fn test_dialect_from_format() {
        assert_eq!(SqlImporter::new(SPANNER_SQL).dialect(), SqlDialect::Spanner);
        assert_eq!(SqlImporter::new(POSTGRES).dialect(), SqlDialect::Postgres);
        assert_eq!(SqlImporter::new(MYSQL).dialect(), SqlDialect::MySql);
        assert_eq!(SqlImporter::new(BIGQUERY).dialect(), SqlDialect::BigQuery);
    }

    #[test]
    fn test_spanner_tables() {
        let ddl = r"
-- singers and their albums
CREATE TABLE Singers (
  SingerId   INT64 NOT NULL,
  FirstName  STRING(1024),
  Bio        STRING(MAX),
  Tags       ARRAY<STRING(64)>,
) PRIMARY KEY (SingerId);

CREATE TABLE Albums (
  SingerId     INT64 NOT NULL,
  AlbumId      INT64 NOT NULL,
  AlbumTitle   STRING(MAX),
) PRIMARY KEY (SingerId, AlbumId),
  INTERLEAVE IN PARENT Singers ON DELETE CASCADE;

CREATE INDEX AlbumsByTitle ON Albums(AlbumTitle);
";
        let types = import(SPANNER_SQL, ddl);
        let names: Vec<_> = types.items().map(Type::name).collect();
        assert_eq!(names, vec!["Albums", "Singers"]);

        let singers = get(&types, "Singers");
        assert_eq!(singers.attributes(), ["~dialect=spanner"]);
        let fields = singers.fields().unwrap();

        let id = fields.get("SingerId").unwrap();
        assert_eq!(id.ty, TypeRef::Builtin(BuiltinType::Int64));
        assert!(!id.optional);
        assert_eq!(id.attrs, ["~pk"]);

        let first = fields.get("FirstName").unwrap();
        assert!(first.optional);
        assert_eq!(first.size_spec, Some(SizeSpec::min_only(1024)));
        assert_eq!(fields.get("Bio").unwrap().size_spec, Some(SizeSpec::open_ended(0)));

        match &fields.get("Tags").unwrap().ty {
            TypeRef::Inline(inner) => assert!(matches!(inner.kind(), TypeKind::Array { .. })),
            other => panic!("Expected inline array, got {:?}", other),
        }

        let albums = get(&types, "Albums");
        assert_eq!(albums.attributes(), ["~dialect=spanner", "~interleave=Singers"]);
        let pks: Vec<_> = albums
            .fields()
            .unwrap()
            .iter()
            .filter(|f| f.attrs.contains(&"~pk".to_string()))
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(pks, vec!["AlbumId", "SingerId"]);
    }

    #[test]
    fn test_postgres_constraints() {
        let ddl = r#"
CREATE TABLE IF NOT EXISTS public.owners (
    id serial PRIMARY KEY,
    email character varying(255) NOT NULL
);
CREATE TABLE "pets" (
    id bigint NOT NULL,
    owner_id integer REFERENCES owners(id),
    name text,
    born timestamp with time zone,
    CONSTRAINT pets_pk PRIMARY KEY (id),
    CONSTRAINT pets_owner_fk FOREIGN KEY (owner_id) REFERENCES owners (id)
);
"#;
        let types = import(POSTGRES, ddl);
        let owners = get(&types, "owners");
        let id = owners.fields().unwrap().get("id").unwrap();
        assert_eq!(id.attrs, ["~pk", "~autoinc"]);
        let email = owners.fields().unwrap().get("email").unwrap();
        assert_eq!(email.size_spec, Some(SizeSpec::min_only(255)));
        assert!(!email.optional);

        let pets = get(&types, "pets");
        let fields = pets.fields().unwrap();
        assert_eq!(fields.get("id").unwrap().attrs, ["~pk"]);
        assert_eq!(fields.get("owner_id").unwrap().attrs, ["~fk=owners.id"]);
        assert_eq!(fields.get("born").unwrap().ty, TypeRef::Builtin(BuiltinType::Datetime));
    }

    #[test]
    fn test_mysql_backticks() {
        let ddl = "CREATE TABLE `users` (\n  `id` INT NOT NULL AUTO_INCREMENT,\n  `nick` VARCHAR(32) DEFAULT 'a,b',\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;";
        let types = import(MYSQL, ddl);
        let users = get(&types, "users");
        let fields = users.fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("id").unwrap().attrs, ["~autoinc", "~pk"]);
        assert_eq!(fields.get("nick").unwrap().size_spec, Some(SizeSpec::min_only(32)));
    }

    #[test]
    fn test_bigquery_nested_types() {
        let ddl = "CREATE TABLE dataset.events (id STRING NOT NULL, payload STRUCT<a INT64, b STRING>, ids ARRAY<INT64>)";
        let types = import(BIGQUERY, ddl);
        let events = get(&types, "events");
        let fields = events.fields().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("payload").unwrap().ty, TypeRef::Builtin(BuiltinType::Any));
    }

    #[test]
    fn test_comparison_operators_in_checks() {
        let ddl = "CREATE TABLE people (\n  age INT CHECK (age > 0),\n  score INT CHECK (score < 10) DEFAULT 1,\n  name TEXT NOT NULL,\n  CHECK (age <> score AND age >= 0)\n);\nCREATE TABLE pets (id INT);";
        let types = import(POSTGRES, ddl);
        assert_eq!(types.len(), 2);

        let people = get(&types, "people");
        let fields: Vec<_> = people.fields().unwrap().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["age", "name", "score"]);
        assert!(!people.fields().unwrap().get("name").unwrap().optional);
    }

    #[test]
    fn test_nested_array_of_struct() {
        let ddl = "CREATE TABLE logs (entries ARRAY<STRUCT<at TIMESTAMP, tags ARRAY<STRING>>>, ok BOOL)";
        let types = import(BIGQUERY, ddl);
        let fields = get(&types, "logs").fields().unwrap();
        assert_eq!(fields.len(), 2);
        match &fields.get("entries").unwrap().ty {
            TypeRef::Inline(inner) => assert!(matches!(inner.kind(), TypeKind::Array { .. })),
            other => panic!("Expected inline array, got {:?}", other),
        }
        assert_eq!(fields.get("ok").unwrap().ty, TypeRef::Builtin(BuiltinType::Bool));
    }

    #[test]
    fn test_unterminated_table() {
        let err = SqlImporter::new(POSTGRES).import("CREATE TABLE t (id int").unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, f(b, c), 'x,y'", ','), vec!["a", " f(b, c)", " 'x,y'"]);
        assert_eq!(split_top_level("a > 1, b < 2", ','), vec!["a > 1", " b < 2"]);
        assert_eq!(split_top_level("m ARRAY<STRUCT<x, y>>, n", ','), vec!["m ARRAY<STRUCT<x, y>>", " n"]);
    }
}
