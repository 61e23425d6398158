//! 編集面から取り出したテキストの平坦化

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// 編集面の生テキストを論理テキストに正規化する
///
/// * 改行は `\n` に統一
/// * ノーブレークスペースは通常の空白
/// * ゼロ幅文字は除去
pub fn flatten_surface_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\u{00A0}' | '\u{202F}' => out.push(' '),
            ch if ZERO_WIDTH.contains(&ch) => {}
            ch => out.push(ch),
        }
    }
    out
}

/// 空白以外の文字を含むか
pub fn has_visible_text(text: &str) -> bool {
    text.chars()
        .any(|ch| !ch.is_whitespace() && !ZERO_WIDTH.contains(&ch))
}
