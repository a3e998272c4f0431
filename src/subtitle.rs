//! Word-by-word caption track in Advanced SubStation Alpha format, burned
//! into the frame by ffmpeg's `ass` filter (libass handles wrapping).

use crate::config::VideoSettings;
use crate::timeline::Caption;

/// `H:MM:SS.cc`, the centisecond clock ASS events use.
pub fn format_ass_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        cs
    )
}

/// `&HAABBGGRR` for white at the given opacity; ASS alpha 00 is opaque.
fn white_with_opacity(opacity: f64) -> String {
    let alpha = ((1.0 - opacity.clamp(0.0, 1.0)) * 255.0).round() as u8;
    format!("&H{:02X}FFFFFF", alpha)
}

/// Keeps a word from being read as an override block or a line-break escape.
fn escape_ass_text(word: &str) -> String {
    word.replace('\\', "/")
        .replace('{', "(")
        .replace('}', ")")
}

/// Renders the full `.ass` document for `captions` on the configured canvas.
///
/// Captions are top-centre aligned with their top edge at `caption_top`, bold,
/// white, and wrap inside the full frame width.
pub fn render_ass(captions: &[Caption], settings: &VideoSettings) -> String {
    let colour = white_with_opacity(settings.caption_opacity);
    let mut out = String::new();

    out.push_str("[Script Info]\n");
    out.push_str("ScriptType: v4.00+\n");
    out.push_str(&format!("PlayResX: {}\n", settings.width));
    out.push_str(&format!("PlayResY: {}\n", settings.height));
    out.push_str("WrapStyle: 0\n");
    out.push_str("ScaledBorderAndShadow: yes\n\n");

    out.push_str("[V4+ Styles]\n");
    out.push_str("Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n");
    out.push_str(&format!(
        "Style: Caption,{},{},{c},{c},&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,0,0,8,0,0,{},1\n\n",
        settings.font,
        settings.font_size,
        settings.caption_top,
        c = colour
    ));

    out.push_str("[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for caption in captions {
        out.push_str(&format!(
            "Dialogue: 0,{},{},Caption,,0,0,0,,{}\n",
            format_ass_timestamp(caption.start),
            format_ass_timestamp(caption.end),
            escape_ass_text(&caption.word)
        ));
    }
    out
}
