//! 順序キー（フラクショナルインデックス）
//!
//! base-62 の桁列で表し、辞書順がそのまま文書順になる。
//! 末尾が最小桁 `0` のキーは作らない（その直前に挿入できなくなるため）

use crate::error::{BlockError, Result};

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: usize = 62;

fn digit_value(ch: u8) -> Option<usize> {
    match ch {
        b'0'..=b'9' => Some((ch - b'0') as usize),
        b'A'..=b'Z' => Some((ch - b'A') as usize + 10),
        b'a'..=b'z' => Some((ch - b'a') as usize + 36),
        _ => None,
    }
}

/// キーが有効か検証
pub fn validate_key(key: &str) -> Result<()> {
    let bytes = key.as_bytes();
    let valid = !bytes.is_empty()
        && bytes.iter().all(|ch| digit_value(*ch).is_some())
        && bytes.last() != Some(&b'0');
    if valid {
        Ok(())
    } else {
        Err(BlockError::InvalidOrderKey {
            key: key.to_string(),
        }
        .into())
    }
}

fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(b'0') == b[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = b[..n].to_vec();
            let rest_a = if n <= a.len() { &a[n..] } else { &[][..] };
            out.extend(midpoint(rest_a, Some(&b[n..])));
            return out;
        }
    }

    let low = a.first().and_then(|ch| digit_value(*ch)).unwrap_or(0);
    let high = b
        .and_then(|b| b.first())
        .and_then(|ch| digit_value(*ch))
        .unwrap_or(BASE);

    if high - low > 1 {
        vec![DIGITS[(low + high + 1) / 2]]
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        vec![b[0]]
    } else {
        let mut out = vec![DIGITS[low]];
        let rest = if a.is_empty() { &[][..] } else { &a[1..] };
        out.extend(midpoint(rest, None));
        out
    }
}

/// `before` と `after` の間に入る順序キーを計算
///
/// どちらも省略可能。省略側は文書の端とみなす
pub fn key_between(before: Option<&str>, after: Option<&str>) -> Result<String> {
    if let Some(key) = before {
        validate_key(key)?;
    }
    if let Some(key) = after {
        validate_key(key)?;
    }
    if let (Some(a), Some(b)) = (before, after) {
        if a >= b {
            return Err(BlockError::OrderKeyRange {
                before: a.to_string(),
                after: b.to_string(),
            }
            .into());
        }
    }

    let a = before.unwrap_or("").as_bytes();
    let key = midpoint(a, after.map(str::as_bytes));
    // DIGITS は ASCII のみ
    Ok(String::from_utf8_lossy(&key).into_owned())
}

/// `before` と `after` の間に `n` 個の昇順キーを計算
pub fn n_keys_between(before: Option<&str>, after: Option<&str>, n: usize) -> Result<Vec<String>> {
    match n {
        0 => Ok(Vec::new()),
        1 => Ok(vec![key_between(before, after)?]),
        _ => match (before, after) {
            (_, None) => {
                let mut keys = Vec::with_capacity(n);
                let mut previous = before.map(str::to_string);
                for _ in 0..n {
                    let key = key_between(previous.as_deref(), None)?;
                    keys.push(key.clone());
                    previous = Some(key);
                }
                Ok(keys)
            }
            (None, Some(_)) => {
                let mut keys = Vec::with_capacity(n);
                let mut next = after.map(str::to_string);
                for _ in 0..n {
                    let key = key_between(None, next.as_deref())?;
                    keys.push(key.clone());
                    next = Some(key);
                }
                keys.reverse();
                Ok(keys)
            }
            (Some(_), Some(_)) => {
                let half = n / 2;
                let middle = key_between(before, after)?;
                let mut keys = n_keys_between(before, Some(&middle), half)?;
                keys.push(middle.clone());
                keys.extend(n_keys_between(Some(&middle), after, n - half - 1)?);
                Ok(keys)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlockcaretError;

    #[test]
    fn test_first_key() {
        assert_eq!(key_between(None, None).unwrap(), "V");
    }

    #[test]
    fn test_append_and_prepend() {
        let first = key_between(None, None).unwrap();
        let after = key_between(Some(&first), None).unwrap();
        let before = key_between(None, Some(&first)).unwrap();
        assert!(before < first);
        assert!(first < after);
    }

    #[test]
    fn test_adjacent_digits() {
        let key = key_between(Some("1"), Some("2")).unwrap();
        assert_eq!(key, "1V");
        let key = key_between(None, Some("1")).unwrap();
        assert_eq!(key, "0V");
    }

    #[test]
    fn test_common_prefix() {
        let key = key_between(Some("a1"), Some("a2")).unwrap();
        assert!(key.as_str() > "a1" && key.as_str() < "a2");
        assert!(key.starts_with("a1"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = key_between(Some("b"), Some("a")).unwrap_err();
        assert!(matches!(
            err,
            BlockcaretError::Block(BlockError::OrderKeyRange { .. })
        ));
    }

    #[test]
    fn test_trailing_zero_rejected() {
        assert!(validate_key("a0").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("a-").is_err());
        assert!(validate_key("a1").is_ok());
    }

    #[test]
    fn test_n_keys_between_sorted_and_bounded() {
        let keys = n_keys_between(Some("A"), Some("B"), 7).unwrap();
        assert_eq!(keys.len(), 7);
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(keys[0].as_str() > "A");
        assert!(keys[6].as_str() < "B");

        let tail = n_keys_between(Some("z"), None, 3).unwrap();
        assert!(tail.windows(2).all(|pair| pair[0] < pair[1]));
        let head = n_keys_between(None, Some("1"), 3).unwrap();
        assert!(head.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(head[2].as_str() < "1");
    }
}
