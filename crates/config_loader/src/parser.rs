//! 配置解析模块
//!
//! 支持 Java properties (主要)、TOML 和 JSON 格式。所有格式最终都展开为
//! 点分键到字符串值的扁平映射。

use std::collections::BTreeMap;

use contracts::ContractError;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `key=value` properties 格式 (推荐)
    Properties,
    /// TOML 格式，嵌套表展开为点分键
    Toml,
    /// JSON 格式，嵌套对象展开为点分键
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "properties" | "props" | "conf" => Some(Self::Properties),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

type Entries = BTreeMap<String, String>;

/// 解析 properties 格式配置
///
/// 与 `java.util.Properties::load` 一致：
/// - 空行以及以 `#` / `!` 开头的行被忽略
/// - 行尾奇数个 `\` 表示续行，下一行的前导空白被丢弃
/// - 键在第一个未转义的 `=`、`:` 或空白处结束
/// - 键和值都处理 `\uXXXX`、`\t`、`\n`、`\r`、`\f` 以及 `\x` -> `x` 转义
/// - 值保留尾部空白
///
/// 重复的键以后出现者为准。
pub fn parse_properties(content: &str) -> Result<Entries, ContractError> {
    let mut entries = Entries::new();
    let mut lines = content.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = line.to_string();
        while is_continued(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_property(&logical, idx + 1)?;
        if key.is_empty() {
            return Err(ContractError::config_parse(format!(
                "properties parse error: line {} has no key",
                idx + 1
            )));
        }
        entries.insert(key, value);
    }
    Ok(entries)
}

/// 行尾反斜杠个数为奇数时续行
fn is_continued(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_property(line: &str, line_no: usize) -> Result<(String, String), ContractError> {
    let chars: Vec<char> = line.chars().collect();

    let mut key_end = chars.len();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }

    // 键后：空白，最多一个分隔符，再是空白
    let mut value_start = key_end;
    let mut separated = false;
    if value_start < chars.len() && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        separated = true;
    }
    while value_start < chars.len() && chars[value_start].is_whitespace() {
        value_start += 1;
    }
    if !separated && value_start < chars.len() && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        while value_start < chars.len() && chars[value_start].is_whitespace() {
            value_start += 1;
        }
    }

    Ok((
        unescape(&chars[..key_end], line_no)?,
        unescape(&chars[value_start..], line_no)?,
    ))
}

fn unescape(chars: &[char], line_no: usize) -> Result<String, ContractError> {
    let mut out = String::with_capacity(chars.len());
    // 连续的 \uXXXX 按 UTF-16 解码，以支持代理对
    let mut utf16: Vec<u16> = Vec::new();
    let mut iter = chars.iter().copied();

    while let Some(c) = iter.next() {
        if c != '\\' {
            flush_utf16(&mut utf16, &mut out);
            out.push(c);
            continue;
        }
        let Some(escaped) = iter.next() else {
            break;
        };
        if escaped == 'u' {
            let hex: String = iter.by_ref().take(4).collect();
            let unit = u16::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                .ok_or_else(|| {
                    ContractError::config_parse(format!(
                        "properties parse error: malformed \\uxxxx escape on line {line_no}"
                    ))
                })?;
            utf16.push(unit);
            continue;
        }
        flush_utf16(&mut utf16, &mut out);
        out.push(match escaped {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\u{c}',
            other => other,
        });
    }
    flush_utf16(&mut utf16, &mut out);
    Ok(out)
}

fn flush_utf16(units: &mut Vec<u16>, out: &mut String) {
    out.extend(
        char::decode_utf16(units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<Entries, ContractError> {
    let table: toml::Table = toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })?;

    let mut entries = Entries::new();
    for (key, value) in &table {
        flatten_toml(key, value, &mut entries)?;
    }
    Ok(entries)
}

fn flatten_toml(key: &str, value: &toml::Value, out: &mut Entries) -> Result<(), ContractError> {
    match value {
        toml::Value::Table(table) => {
            for (child, value) in table {
                flatten_toml(&format!("{key}.{child}"), value, out)?;
            }
        }
        toml::Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| toml_scalar(key, item))
                .collect::<Result<Vec<_>, _>>()?
                .join(",");
            out.insert(key.to_string(), joined);
        }
        scalar => {
            out.insert(key.to_string(), toml_scalar(key, scalar)?);
        }
    }
    Ok(())
}

fn toml_scalar(key: &str, value: &toml::Value) -> Result<String, ContractError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => Err(ContractError::config_validation(
            key,
            "nested arrays and tables inside arrays are not supported",
        )),
    }
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<Entries, ContractError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
            message: format!("JSON parse error: {e}"),
            source: Some(Box::new(e)),
        })?;

    let serde_json::Value::Object(root) = value else {
        return Err(ContractError::config_parse(
            "JSON parse error: top level must be an object",
        ));
    };

    let mut entries = Entries::new();
    for (key, value) in &root {
        flatten_json(key, value, &mut entries)?;
    }
    Ok(entries)
}

fn flatten_json(key: &str, value: &serde_json::Value, out: &mut Entries) -> Result<(), ContractError> {
    use serde_json::Value;

    match value {
        // null 视为未设置
        Value::Null => {}
        Value::Object(map) => {
            for (child, value) in map {
                flatten_json(&format!("{key}.{child}"), value, out)?;
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| json_scalar(key, item))
                .collect::<Result<Vec<_>, _>>()?
                .join(",");
            out.insert(key.to_string(), joined);
        }
        scalar => {
            out.insert(key.to_string(), json_scalar(key, scalar)?);
        }
    }
    Ok(())
}

fn json_scalar(key: &str, value: &serde_json::Value) -> Result<String, ContractError> {
    use serde_json::Value;

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(ContractError::config_validation(
            key,
            "only strings, numbers and booleans are allowed inside arrays",
        )),
    }
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<Entries, ContractError> {
    match format {
        ConfigFormat::Properties => parse_properties(content),
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
