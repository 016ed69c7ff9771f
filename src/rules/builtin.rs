//! Built-in validation rules
//!
//! Every rule except `notempty`, `minlength` and `passretry` accepts an empty
//! value: optionality is expressed by leaving `notempty` out of a field's
//! descriptor. `minlength` measures the empty string like any other, so
//! `notempty;minlength:5` on an empty field reports both failures.

use std::sync::LazyLock;

use regex::Regex;

use super::{RuleContext, RuleRegistry};

pub const NOTEMPTY: &str = "notempty";
pub const MINLENGTH: &str = "minlength";
pub const MAXLENGTH: &str = "maxlength";
pub const HASDOMAIN: &str = "hasdomain";
pub const ISNUMERIC: &str = "isnumeric";
pub const INTONLY: &str = "intonly";
pub const ISEMAIL: &str = "isemail";
pub const ISURL: &str = "isurl";
pub const ISDATE: &str = "isdate";
pub const ISPHONE: &str = "isphone";
pub const MININT: &str = "minint";
pub const MAXINT: &str = "maxint";
pub const PASSRETRY: &str = "passretry";

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+@.+\..{2,9}$").unwrap());

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(http|ftp|https)://.+\..{2,9}").unwrap());

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2})(\.|/)([0-9]{1,2})(\.|/)([0-9]{4})$").unwrap()
});

// Optional 8 / +7 prefix, optional (area code), then a 7-10 char digit group.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((8|\+7)?[\- ]?)?(\(?[0-9]{3}\)?[\- ]?)?[0-9\- ]{7,10}$").unwrap()
});

/// Register every built-in rule with its default English message.
pub fn register_all(registry: &RuleRegistry) {
    registry.register(NOTEMPTY, "This field cannot be empty.", |_, value, _| {
        !value.is_empty()
    });

    registry.register(MINLENGTH, "At least {%} characters.", |_, value, param| {
        param
            .and_then(|p| p.trim().parse::<usize>().ok())
            .is_some_and(|min| value.chars().count() >= min)
    });

    registry.register(MAXLENGTH, "No more than {%} characters.", |_, value, param| {
        param
            .and_then(|p| p.trim().parse::<usize>().ok())
            .is_some_and(|max| value.chars().count() <= max)
    });

    registry.register(
        HASDOMAIN,
        "The address must start with a valid domain ({%}).",
        |_, value, param| value.is_empty() || has_domain(value, param.unwrap_or_default()),
    );

    registry.register(ISNUMERIC, "Only digits are allowed.", |_, value, _| {
        value.is_empty() || DIGITS_RE.is_match(value)
    });

    registry.register(INTONLY, "Only a whole number is allowed.", |_, value, _| {
        value.is_empty() || DIGITS_RE.is_match(value)
    });

    registry.register(ISEMAIL, "A valid e-mail address is required.", |_, value, _| {
        value.is_empty() || EMAIL_RE.is_match(value)
    });

    registry.register(ISURL, "A valid website URL is required.", |_, value, _| {
        value.is_empty() || URL_RE.is_match(value)
    });

    registry.register(ISDATE, "The field must contain a date.", |_, value, _| {
        value.is_empty() || is_loose_date(value)
    });

    registry.register(ISPHONE, "Invalid phone number format.", |_, value, _| {
        value.is_empty() || PHONE_RE.is_match(value)
    });

    registry.register(MININT, "The minimum allowed number is {%}.", |_, value, param| {
        value.is_empty() || compare_ints(value, param, |v, bound| v >= bound)
    });

    registry.register(MAXINT, "The maximum allowed number is {%}.", |_, value, param| {
        value.is_empty() || compare_ints(value, param, |v, bound| v <= bound)
    });

    registry.register(
        PASSRETRY,
        "Must match the password field.",
        |ctx: &RuleContext<'_>, value, param| {
            let reference = param.unwrap_or(ctx.default_password_field);
            ctx.page
                .field_value(reference)
                .is_some_and(|expected| expected == value)
        },
    );
}

/// Substring match against any of the comma-separated domains.
fn has_domain(value: &str, domains: &str) -> bool {
    domains.split(',').any(|domain| value.contains(domain.trim()))
}

/// `D{1,2}(.|/)D{1,2}(.|/)D{4}` with day <= 31, month <= 12, year < 2500.
///
/// Day is not checked against month or leap years: `31.02.2020` passes.
fn is_loose_date(value: &str) -> bool {
    let Some(caps) = DATE_RE.captures(value) else {
        return false;
    };
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    match (part(1), part(3), part(5)) {
        (Some(day), Some(month), Some(year)) => day <= 31 && month <= 12 && year < 2500,
        _ => false,
    }
}

fn compare_ints(value: &str, param: Option<&str>, cmp: fn(i64, i64) -> bool) -> bool {
    match (parse_int_prefix(value), param.and_then(parse_int_prefix)) {
        (Some(v), Some(bound)) => cmp(v, bound),
        _ => false,
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits up to
/// the first non-digit. `"12px"` is 12, `"px"` has no value.
pub(crate) fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
