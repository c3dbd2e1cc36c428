//! Format specifiers: `[[fill]align][0][width][.precision][type]`
//!
//! Align is one of `<`, `>`, `^`; type is `d`, `f` or `s`. The same specifiers
//! are used inside translated messages as `{N:spec}`.

use crate::error::{ConvertError, Result};

use super::Number;

/// A positional argument for [`format_message`]
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Number(Number),
    Text(String),
}

impl From<i64> for FormatArg {
    fn from(value: i64) -> Self {
        FormatArg::Number(Number::Int(value))
    }
}

impl From<&str> for FormatArg {
    fn from(value: &str) -> Self {
        FormatArg::Text(value.to_string())
    }
}

impl From<String> for FormatArg {
    fn from(value: String) -> Self {
        FormatArg::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits
    AfterSign,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<Align>,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

/// Largest accepted width or precision
const MAX_FIELD: usize = 1024;

fn bad_spec(spec: &str) -> ConvertError {
    ConvertError::Expression(format!("invalid format specifier '{}'", spec))
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

impl FormatSpec {
    fn parse(spec: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = FormatSpec::default();
        let mut i = 0;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            out.fill = Some(chars[0]);
            out.align = align_of(chars[1]);
            i = 2;
        } else if let Some(align) = chars.first().and_then(|c| align_of(*c)) {
            out.align = Some(align);
            i = 1;
        }

        if chars.get(i) == Some(&'0') {
            out.zero = true;
            i += 1;
        }

        let digits = |i: &mut usize| {
            let start = *i;
            while *i < chars.len() && chars[*i].is_ascii_digit() {
                *i += 1;
            }
            chars[start..*i].iter().collect::<String>()
        };

        let width = digits(&mut i);
        if !width.is_empty() {
            out.width = width.parse().map_err(|_| bad_spec(spec))?;
            if out.width > MAX_FIELD {
                return Err(bad_spec(spec));
            }
        }

        if chars.get(i) == Some(&'.') {
            i += 1;
            let precision: usize = digits(&mut i).parse().map_err(|_| bad_spec(spec))?;
            if precision > MAX_FIELD {
                return Err(bad_spec(spec));
            }
            out.precision = Some(precision);
        }

        match chars.get(i) {
            Some(c @ ('d' | 'f' | 's')) => {
                out.kind = Some(*c);
                i += 1;
            }
            Some(_) => return Err(bad_spec(spec)),
            None => {}
        }

        if i != chars.len() {
            return Err(bad_spec(spec));
        }
        Ok(out)
    }

    fn pad(&self, body: String, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }

        let (fill, align) = match (self.align, self.zero) {
            (Some(align), _) => (self.fill.unwrap_or(if self.zero { '0' } else { ' ' }), align),
            (None, true) if numeric => ('0', Align::AfterSign),
            (None, true) => ('0', Align::Left),
            (None, false) if numeric => (' ', Align::Right),
            (None, false) => (' ', Align::Left),
        };

        let missing = self.width - len;
        let repeat = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
        match align {
            Align::Left => format!("{}{}", body, repeat(missing)),
            Align::Right => format!("{}{}", repeat(missing), body),
            Align::Center => {
                let left = missing / 2;
                format!("{}{}{}", repeat(left), body, repeat(missing - left))
            }
            Align::AfterSign => match body.strip_prefix('-') {
                Some(digits) => format!("-{}{}", repeat(missing), digits),
                None => format!("{}{}", repeat(missing), body),
            },
        }
    }
}

/// Render one value with a format specifier (without the leading `:`)
pub fn format_value(arg: &FormatArg, spec: &str) -> Result<String> {
    let spec_text = spec;
    let spec = FormatSpec::parse(spec)?;

    let (body, numeric) = match (arg, spec.kind) {
        (FormatArg::Number(Number::Int(i)), None | Some('d')) => {
            if spec.precision.is_some() {
                return Err(bad_spec(spec_text));
            }
            (i.to_string(), true)
        }
        (FormatArg::Number(n), Some('f')) => {
            (format!("{:.*}", spec.precision.unwrap_or(6), n.as_f64()), true)
        }
        (FormatArg::Number(Number::Float(f)), None) => match spec.precision {
            Some(precision) => (format!("{:.*}", precision, f), true),
            None => (Number::Float(*f).to_string(), true),
        },
        (FormatArg::Text(text), None | Some('s')) => {
            let text = match spec.precision {
                Some(precision) => text.chars().take(precision).collect(),
                None => text.clone(),
            };
            (text, false)
        }
        (arg, Some(kind)) => {
            return Err(ConvertError::Expression(format!(
                "format code '{}' does not apply to {:?}",
                kind, arg
            )))
        }
    };

    Ok(spec.pad(body, numeric))
}

/// Fill `{N}`, `{N:spec}` and `{}` placeholders from `args`
///
/// `{{` and `}}` produce literal braces.
pub fn format_message(template: &str, args: &[FormatArg]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => {
                            return Err(ConvertError::Expression(format!(
                                "unterminated placeholder in '{}'",
                                template
                            )))
                        }
                    }
                }
                let (index, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let index = if index.is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    index
                        .parse::<usize>()
                        .map_err(|_| ConvertError::Expression(format!("bad placeholder '{{{}}}'", field)))?
                };
                let arg = args.get(index).ok_or_else(|| {
                    ConvertError::Expression(format!("missing argument {} for '{}'", index, template))
                })?;
                out.push_str(&format_value(arg, spec)?);
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
