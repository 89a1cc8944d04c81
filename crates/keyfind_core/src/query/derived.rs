//! Query derivation from finder method names.
//!
//! Names follow the familiar repository convention:
//!
//! ```text
//! find[Subject]By<Predicate>[And<Predicate>...][OrderBy<Property>[Asc|Desc]...]
//! ```
//!
//! The prefix may be `find`, `read`, `get`, `query`, `stream` or `count`. A
//! subject of `First<N>` or `Top<N>` limits the result (to one when `N` is
//! omitted); any other subject, such as an entity name, is ignored.
//!
//! # Example
//!
//! ```rust
//! use keyfind_core::{DerivedQuery, Value};
//!
//! let derived = DerivedQuery::parse("findByLastnameOrderByFirstnameAsc").unwrap();
//! let query = derived.bind(&[Value::from("Matthews")]).unwrap();
//! assert_eq!(query.criteria.len(), 1);
//! assert!(!query.is_unsorted());
//! ```

use super::{Condition, Criterion, Direction, Order, Query, Sort};
use crate::error::{CoreError, CoreResult};
use keyfind_storage::Value;

const PREFIXES: [&str; 6] = ["find", "read", "get", "query", "stream", "count"];

/// Operator keywords, matched as suffixes of a predicate. Longer keywords
/// come before keywords they end with.
const KEYWORDS: [(&str, Operator); 17] = [
    ("IsNotNull", Operator::IsNotNull),
    ("NotNull", Operator::IsNotNull),
    ("IsNull", Operator::IsNull),
    ("GreaterThanEqual", Operator::GreaterThanEqual),
    ("GreaterThan", Operator::GreaterThan),
    ("LessThanEqual", Operator::LessThanEqual),
    ("LessThan", Operator::LessThan),
    ("Between", Operator::Between),
    ("StartingWith", Operator::StartingWith),
    ("StartsWith", Operator::StartingWith),
    ("Containing", Operator::Containing),
    ("Contains", Operator::Containing),
    ("IsIn", Operator::In),
    ("In", Operator::In),
    ("Not", Operator::NotEqual),
    ("Equals", Operator::Equal),
    ("Is", Operator::Equal),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    Between,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    In,
    StartingWith,
    Containing,
    IsNull,
    IsNotNull,
}

impl Operator {
    fn arity(self) -> usize {
        match self {
            Operator::IsNull | Operator::IsNotNull => 0,
            Operator::Between => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Property {
    Id,
    Bin(String),
}

impl Property {
    fn from_segment(segment: &str) -> Self {
        if segment == "Id" {
            Property::Id
        } else {
            Property::Bin(lower_camel(segment))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    property: Property,
    operator: Operator,
    /// The predicate text before operator parsing, used when `In` turns out
    /// to be part of the property name.
    source: String,
}

/// A parsed finder method name, ready to be bound to arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedQuery {
    method: String,
    count: bool,
    limit: Option<u64>,
    parts: Vec<Part>,
    orders: Vec<Order>,
}

impl DerivedQuery {
    /// Parses a method name.
    pub fn parse(method: &str) -> CoreResult<Self> {
        let invalid = |reason: &str| {
            CoreError::invalid_query(format!("cannot derive query from '{method}': {reason}"))
        };

        let prefix = PREFIXES
            .iter()
            .find(|prefix| method.starts_with(*prefix))
            .ok_or_else(|| invalid("unknown prefix"))?;
        let rest = &method[prefix.len()..];
        if rest.chars().next().is_some_and(char::is_lowercase) {
            return Err(invalid("unknown prefix"));
        }

        let (head, order_clause) = match rest.find("OrderBy") {
            Some(pos) => (&rest[..pos], Some(&rest[pos + "OrderBy".len()..])),
            None => (rest, None),
        };
        let (subject, predicate) = match head.find("By") {
            Some(pos) => (&head[..pos], Some(&head[pos + 2..])),
            None => (head, None),
        };

        let limit = parse_limit(subject).map_err(|reason| invalid(&reason))?;

        let mut parts = Vec::new();
        if let Some(predicate) = predicate {
            if predicate.is_empty() {
                return Err(invalid("missing predicate after 'By'"));
            }
            for segment in split_words(predicate, "And") {
                parts.push(parse_part(segment).map_err(|reason| invalid(&reason))?);
            }
        }

        let orders = match order_clause {
            Some(clause) => parse_orders(clause).map_err(|reason| invalid(&reason))?,
            None => Vec::new(),
        };

        Ok(Self {
            method: method.to_string(),
            count: *prefix == "count",
            limit,
            parts,
            orders,
        })
    }

    /// The method name this was parsed from.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns true for `count...` methods.
    pub fn is_count(&self) -> bool {
        self.count
    }

    /// Number of positional arguments the method takes.
    pub fn arity(&self) -> usize {
        self.parts.iter().map(|part| part.operator.arity()).sum()
    }

    /// Binds positional arguments, producing a query.
    pub fn bind(&self, args: &[Value]) -> CoreResult<Query> {
        if args.len() != self.arity() {
            return Err(CoreError::invalid_query(format!(
                "'{}' expects {} argument(s), got {}",
                self.method,
                self.arity(),
                args.len()
            )));
        }

        let mut remaining = args.iter().cloned();
        let mut criteria = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let taken: Vec<Value> = remaining.by_ref().take(part.operator.arity()).collect();
            criteria.push(self.criterion(part, taken)?);
        }

        Ok(Query {
            criteria,
            sort: (!self.orders.is_empty()).then(|| Sort::by(self.orders.clone())),
            offset: None,
            limit: self.limit,
        })
    }

    fn criterion(&self, part: &Part, args: Vec<Value>) -> CoreResult<Criterion> {
        let mut args = args.into_iter();
        let first = args.next().unwrap_or(Value::Null);

        let bin = match &part.property {
            Property::Id => {
                return match (part.operator, first) {
                    (Operator::Equal, id) => Ok(Criterion::Id(id)),
                    (Operator::In, Value::List(ids)) => Ok(Criterion::IdIn(ids)),
                    (Operator::In, id) => Ok(Criterion::Id(id)),
                    _ => Err(CoreError::invalid_query(format!(
                        "'{}': the identity only supports equality and In",
                        self.method
                    ))),
                };
            }
            Property::Bin(bin) => bin.clone(),
        };

        let condition = match part.operator {
            Operator::Equal => Condition::Equal(first),
            Operator::NotEqual => Condition::NotEqual(first),
            Operator::GreaterThan => Condition::GreaterThan(first),
            Operator::GreaterThanEqual => Condition::GreaterThanOrEqual(first),
            Operator::LessThan => Condition::LessThan(first),
            Operator::LessThanEqual => Condition::LessThanOrEqual(first),
            Operator::Containing => Condition::Contains(first),
            Operator::IsNull => Condition::Equal(Value::Null),
            Operator::IsNotNull => Condition::NotEqual(Value::Null),
            Operator::Between => Condition::Between(first, args.next().unwrap_or(Value::Null)),
            Operator::StartingWith => match first {
                Value::Text(prefix) => Condition::StartsWith(prefix),
                other => {
                    return Err(CoreError::invalid_query(format!(
                        "'{}': StartingWith expects text, got {}",
                        self.method,
                        other.type_name()
                    )))
                }
            },
            Operator::In => match first {
                Value::List(values) => Condition::In(values),
                // Not a list: the trailing "In" belongs to the property name.
                value => return Ok(Criterion::equal(lower_camel(&part.source), value)),
            },
        };
        Ok(Criterion::Field { bin, condition })
    }
}

fn parse_limit(subject: &str) -> Result<Option<u64>, String> {
    for keyword in ["First", "Top"] {
        let Some(rest) = subject.strip_prefix(keyword) else {
            continue;
        };
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let after = &rest[digits.len()..];
        if after.chars().next().is_some_and(char::is_lowercase) {
            // e.g. "Firstname": an entity name, not a limit
            return Ok(None);
        }
        if digits.is_empty() {
            return Ok(Some(1));
        }
        return digits
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid limit '{digits}'"));
    }
    Ok(None)
}

/// Splits at `word` where it starts a new capitalised word.
fn split_words<'a>(text: &'a str, word: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(found) = text[search..].find(word) {
        let pos = search + found;
        let next = text[pos + word.len()..].chars().next();
        if pos > start && next.is_some_and(char::is_uppercase) {
            segments.push(&text[start..pos]);
            start = pos + word.len();
        }
        search = pos + word.len();
    }
    segments.push(&text[start..]);
    segments
}

fn parse_part(segment: &str) -> Result<Part, String> {
    let (property, operator) = KEYWORDS
        .iter()
        .find_map(|(keyword, operator)| {
            segment
                .strip_suffix(*keyword)
                .filter(|property| !property.is_empty())
                .map(|property| (property, *operator))
        })
        .unwrap_or((segment, Operator::Equal));

    // "AgeIsBetween" -> "Age"
    let property = match property.strip_suffix("Is") {
        Some(stripped) if !stripped.is_empty() && operator != Operator::Equal => stripped,
        _ => property,
    };

    if !property.chars().next().is_some_and(char::is_uppercase) {
        return Err(format!("invalid property in predicate '{segment}'"));
    }

    Ok(Part {
        property: Property::from_segment(property),
        operator,
        source: segment.to_string(),
    })
}

fn parse_orders(clause: &str) -> Result<Vec<Order>, String> {
    let mut orders = Vec::new();
    let mut rest = clause;
    while !rest.is_empty() {
        let (property, direction, consumed) = match find_direction(rest) {
            Some((pos, direction, len)) => (&rest[..pos], direction, pos + len),
            None => (rest, Direction::Asc, rest.len()),
        };
        if !property.chars().next().is_some_and(char::is_uppercase) {
            return Err(format!("invalid order clause '{clause}'"));
        }
        orders.push(Order::new(lower_camel(property), direction));
        rest = &rest[consumed..];
    }
    if orders.is_empty() {
        return Err("missing property after 'OrderBy'".to_string());
    }
    Ok(orders)
}

/// Finds the first `Asc`/`Desc` that ends a word, past the first character.
fn find_direction(text: &str) -> Option<(usize, Direction, usize)> {
    text.char_indices().skip(1).find_map(|(pos, _)| {
        [("Desc", Direction::Desc), ("Asc", Direction::Asc)]
            .into_iter()
            .find(|(word, _)| {
                text[pos..].starts_with(word)
                    && text[pos + word.len()..]
                        .chars()
                        .next()
                        .map_or(true, char::is_uppercase)
            })
            .map(|(word, direction)| (pos, direction, word.len()))
    })
}

fn lower_camel(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
