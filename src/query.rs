use nom::{
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 4;

/// Raw `GET /movies` query parameters.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub genre: Option<String>,
    pub pag: Option<String>,
    pub qt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListQuery {
    All,
    Genre(String),
    /// `page` is 1-indexed; 0 never holds data
    Page { page: u64, size: usize },
}

impl ListParams {
    /// Genre wins over pagination; empty values count as absent.
    pub fn into_query(self) -> ListQuery {
        let genre = self.genre.filter(|g| !g.is_empty());
        let pag = self.pag.filter(|p| !p.is_empty());

        if let Some(genre) = genre {
            return ListQuery::Genre(genre);
        }
        if let Some(pag) = pag {
            return ListQuery::Page {
                page: page_number(&pag).unwrap_or(0),
                size: page_size(self.qt.as_deref()),
            };
        }
        ListQuery::All
    }
}

// --- PARSERS ---

fn parse_unsigned(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

/// Whole-string page number: surrounding whitespace and a leading `+` allowed.
fn parse_page(input: &str) -> IResult<&str, u64> {
    all_consuming(delimited(
        multispace0,
        preceded(opt(char('+')), parse_unsigned),
        multispace0,
    ))(input)
}

/// Leading signed integer; trailing garbage is ignored (`"7abc"` is 7).
fn parse_leading_int(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(multispace0, recognize(pair(opt(one_of("+-")), digit1))),
        |s: &str| s.parse::<i64>(),
    )(input)
}

/// Strict on purpose: `"1.5"` and `"-1"` are rejected (and so 404) rather than
/// sliced loosely into whatever window they happen to land on.
pub fn page_number(raw: &str) -> Option<u64> {
    parse_page(raw).ok().map(|(_, n)| n)
}

/// Falls back to [`DEFAULT_PAGE_SIZE`] unless `raw` starts with a positive integer.
pub fn page_size(raw: Option<&str>) -> usize {
    raw.and_then(|s| parse_leading_int(s).ok())
        .and_then(|(_, n)| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}
