//! HTML 链接改写
//!
//! 中继后的页面地址是 `/p/{token}`，页面里的相对链接会被浏览器解析到中继自身。
//! 这里把 `href` / `src` 中的相对地址按源站地址解析为绝对地址，并注入 `<base>`。
//!
//! 这是一个有意收窄的正则替换，已知不处理：
//! - 属性值内部的转义引号
//! - 内联样式里的 `url(...)`
//! - `srcset`
//! - 无引号的属性值
//! - 查询串中被编码的分隔符

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;
use tracing::debug;
use url::Url;

lazy_static! {
    /// `href="..."` / `src='...'`
    static ref LINK_ATTR: Result<Regex, regex::Error> = Regex::new(
        r#"(?i)(?P<attr>\s(?:href|src)\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#
    );

    /// 开始的 `<head>` 标签（允许带属性）
    static ref HEAD_OPEN: Result<Regex, regex::Error> = Regex::new(r"(?i)<head(?:\s[^>]*)?>");

    /// 任意 URI scheme 前缀，如 `https:`、`mailto:`、`data:`
    static ref SCHEME: Result<Regex, regex::Error> = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:");
}

/// 改写 HTML 正文
///
/// 正文不是 UTF-8 或正则不可用时原样返回。
pub fn rewrite_html(body: &[u8], origin: &Url) -> Vec<u8> {
    let Ok(html) = std::str::from_utf8(body) else {
        debug!("HTML body is not valid UTF-8, skip rewriting");
        return body.to_vec();
    };

    let (Ok(link_attr), Ok(head_open), Ok(scheme)) =
        (LINK_ATTR.as_ref(), HEAD_OPEN.as_ref(), SCHEME.as_ref())
    else {
        debug!("HTML rewrite patterns unavailable, skip rewriting");
        return body.to_vec();
    };

    let resolved = link_attr.replace_all(html, |caps: &Captures| {
        let (value, quote) = match (caps.name("dq"), caps.name("sq")) {
            (Some(value), _) => (value.as_str(), '"'),
            (None, Some(value)) => (value.as_str(), '\''),
            (None, None) => return caps[0].to_string(),
        };

        match resolve(value, origin, scheme) {
            Some(absolute) => format!("{}{quote}{absolute}{quote}", &caps["attr"]),
            None => caps[0].to_string(),
        }
    });

    inject_base(&resolved, origin, head_open).into_bytes()
}

/// 解析单个属性值；无需改写时返回 None
fn resolve(value: &str, origin: &Url, scheme: &Regex) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || scheme.is_match(trimmed)
    {
        return None;
    }

    origin.join(trimmed).ok().map(String::from)
}

fn inject_base(html: &str, origin: &Url, head_open: &Regex) -> String {
    let base = format!(r#"<base href="{}">"#, escape_attr(origin.as_str()));

    match head_open.find(html) {
        Some(head) => {
            let mut out = String::with_capacity(html.len() + base.len());
            out.push_str(&html[..head.end()]);
            out.push_str(&base);
            out.push_str(&html[head.end()..]);
            out
        }
        None => format!("{base}{html}"),
    }
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    if value.contains(['"', '<', '>', '&']) {
        Cow::Owned(
            value
                .replace('&', "&amp;")
                .replace('"', "&quot;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
        )
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(html: &str, origin: &str) -> String {
        let origin = Url::parse(origin).unwrap();
        String::from_utf8(rewrite_html(html.as_bytes(), &origin)).unwrap()
    }

    #[test]
    fn test_relative_links_are_resolved() {
        let out = rewrite(
            r#"<html><head><title>t</title></head><body><img src="/img.png"><a href='next.html'>n</a></body></html>"#,
            "http://a.example/docs/index.html",
        );
        assert!(out.contains(r#"src="http://a.example/img.png""#));
        assert!(out.contains(r#"href='http://a.example/docs/next.html'"#));
    }

    #[test]
    fn test_base_is_injected_once_after_head() {
        let out = rewrite(
            r#"<html><HEAD lang="en"><title>t</title></HEAD></html>"#,
            "http://a.example/",
        );
        assert_eq!(out.matches("<base ").count(), 1);
        assert!(out.contains(r#"<HEAD lang="en"><base href="http://a.example/">"#));
    }

    #[test]
    fn test_base_is_prepended_without_head() {
        let out = rewrite(r#"<p><a href="x">x</a></p>"#, "http://a.example/dir/");
        assert!(out.starts_with(r#"<base href="http://a.example/dir/">"#));
        assert!(out.contains(r#"href="http://a.example/dir/x""#));
    }

    #[test]
    fn test_head_like_tags_are_not_matched() {
        let out = rewrite(
            "<html><header>h</header><head></head></html>",
            "http://a.example/",
        );
        assert!(out.contains(r#"<head><base href="http://a.example/">"#));
        assert!(out.contains("<header>h</header>"));
    }

    #[test]
    fn test_untouched_values() {
        let html = concat!(
            r#"<a href="">e</a>"#,
            r##"<a href="#top">f</a>"##,
            r#"<script src="//cdn.example.net/lib.js"></script>"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<a href="javascript:void(0)">j</a>"#,
            r#"<a href="mailto:me@example.com">m</a>"#,
            r#"<a href="https://other.example/page">o</a>"#,
            r#"<a href="http://a.example/same">s</a>"#,
        );
        let out = rewrite(html, "http://a.example/");
        let without_base = out.replacen(r#"<base href="http://a.example/">"#, "", 1);
        assert_eq!(without_base, html);
    }

    #[test]
    fn test_non_utf8_body_is_returned_unchanged() {
        let origin = Url::parse("http://a.example/").unwrap();
        let body = vec![0x3c, 0x61, 0xff, 0xfe, 0x3e];
        assert_eq!(rewrite_html(&body, &origin), body);
    }

    #[test]
    fn test_data_src_attribute_is_not_a_link() {
        let out = rewrite(r#"<img data-src="lazy.png">"#, "http://a.example/");
        assert!(out.contains(r#"data-src="lazy.png""#));
    }
}
