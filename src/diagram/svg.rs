//! Standalone SVG rendering of a [`DiagramLayout`].
//!
//! Output is a pure function of the analysis and layout config, so the same
//! analysis always renders to byte-identical markup.

use crate::analysis::SentenceAnalysis;
use crate::utils::sanitize::plain_text;

use super::connectors::{fmt_num, Connector};
use super::layout::{
    layout, DetailRow, DetailsPanel, DiagramLayout, ExplanationPanel, FragmentBanner,
    LayoutConfig, Rect, TextLine, WordBox,
};

const FONT_FAMILY: &str = "'Hiragino Sans', 'Noto Sans JP', 'Yu Gothic', sans-serif";

const CONNECTOR_COLOR: &str = "#3b82f6";
const PANEL_FILL: &str = "#f9fafb";
const PANEL_STROKE: &str = "#e5e7eb";
const TEXT_COLOR: &str = "#111827";
const MUTED_COLOR: &str = "#6b7280";
const POS_COLOR: &str = "#2563eb";
const PARTICLE_TEXT_COLOR: &str = "#ea580c";
const TOPIC_TAG_COLOR: &str = "#7c3aed";

/// Colours for one kind of word box.
struct BoxStyle {
    fill: &'static str,
    stroke: &'static str,
}

const MAIN_BOX: BoxStyle = BoxStyle {
    fill: "#ffffff",
    stroke: "#d1d5db",
};

const TOPIC_BOX: BoxStyle = BoxStyle {
    fill: "#f5f3ff",
    stroke: "#8b5cf6",
};

const PARTICLE_BOX: BoxStyle = BoxStyle {
    fill: "#ffedd5",
    stroke: "#f97316",
};

const TEXT_PANEL: BoxStyle = BoxStyle {
    fill: "#ffffff",
    stroke: PANEL_STROKE,
};

const DETAIL_ROW: BoxStyle = BoxStyle {
    fill: PANEL_FILL,
    stroke: PANEL_FILL,
};

/// Render `analysis` as an SVG document.
pub fn render(analysis: &SentenceAnalysis, config: &LayoutConfig) -> String {
    let geometry = layout(analysis, config);
    render_layout(analysis, &geometry, config)
}

/// Render an already computed layout.
pub fn render_layout(
    analysis: &SentenceAnalysis,
    geometry: &DiagramLayout,
    config: &LayoutConfig,
) -> String {
    let mut svg = String::with_capacity(4096);
    let (w, h) = (fmt_num(geometry.width), fmt_num(geometry.height));
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"{FONT_FAMILY}\">\n"
    ));
    svg.push_str(&format!(
        "<title>{}</title>\n",
        xml_escape(&analysis.original_sentence)
    ));
    svg.push_str(&format!(
        "<rect width=\"{w}\" height=\"{h}\" fill=\"#ffffff\"/>\n"
    ));

    if let Some(banner) = &geometry.fragment_banner {
        push_fragment_banner(&mut svg, banner, config);
    }

    if let Some(band) = &geometry.topic_band {
        svg.push_str("<g class=\"topic-band\">\n");
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"12\" font-weight=\"600\" fill=\"#7c3aed\">Topic (Context)</text>\n",
            fmt_num(geometry.main_panel.x + config.container_padding),
            fmt_num(band.label_y)
        ));
        for word_box in &band.boxes {
            push_word(&mut svg, analysis, word_box, &TOPIC_BOX, config);
        }
        svg.push_str(&format!(
            "<line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"#c4b5fd\" stroke-width=\"1\" stroke-dasharray=\"6 4\"/>\n",
            fmt_num(geometry.main_panel.x),
            fmt_num(geometry.main_panel.x + geometry.main_panel.width),
            y = fmt_num(band.separator_y)
        ));
        svg.push_str("</g>\n");
    }

    let panel = &geometry.main_panel;
    svg.push_str(&format!(
        "<g class=\"main\" transform=\"translate({} {})\">\n",
        fmt_num(panel.x),
        fmt_num(panel.y)
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" rx=\"12\" fill=\"{PANEL_FILL}\" stroke=\"{PANEL_STROKE}\"/>\n",
        fmt_num(panel.width),
        fmt_num(panel.height)
    ));
    for word_box in &geometry.main_boxes {
        push_word(&mut svg, analysis, word_box, &MAIN_BOX, config);
    }
    // Arrows go last so they sit above the boxes.
    for connector in &geometry.connectors {
        push_connector(&mut svg, connector);
    }
    svg.push_str("</g>\n");

    push_explanation(&mut svg, &geometry.explanation, config);
    push_word_details(&mut svg, &geometry.word_details, config);

    svg.push_str("</svg>\n");
    svg
}

fn push_fragment_banner(svg: &mut String, banner: &FragmentBanner, config: &LayoutConfig) {
    let rect = &banner.rect;
    svg.push_str("<g class=\"fragment-banner\">\n");
    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"8\" fill=\"#fef3c7\" stroke=\"#f59e0b\"/>\n",
        fmt_num(rect.x),
        fmt_num(rect.y),
        fmt_num(rect.width),
        fmt_num(rect.height)
    ));
    let x = rect.x + config.banner_padding;
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"#92400e\">Sentence Fragment</text>\n",
        fmt_num(x),
        fmt_num(banner.title_y),
        fmt_num(config.banner_title_font)
    ));
    push_text_lines(svg, &banner.lines, x, config.banner_font, "#b45309");
    svg.push_str("</g>\n");
}

fn push_explanation(svg: &mut String, panel: &ExplanationPanel, config: &LayoutConfig) {
    svg.push_str("<g class=\"explanation\">\n");
    push_panel_frame(svg, &panel.rect, panel.heading_y, "Explanation", config);
    push_text_lines(
        svg,
        &panel.lines,
        panel.rect.x + config.panel_padding,
        config.body_font,
        TEXT_COLOR,
    );
    svg.push_str("</g>\n");
}

fn push_word_details(svg: &mut String, panel: &DetailsPanel, config: &LayoutConfig) {
    svg.push_str("<g class=\"word-details\">\n");
    push_panel_frame(svg, &panel.rect, panel.heading_y, "Word Details", config);
    for row in &panel.rows {
        push_detail_row(svg, row, config);
    }
    svg.push_str("</g>\n");
}

fn push_panel_frame(
    svg: &mut String,
    rect: &Rect,
    heading_y: f64,
    heading: &str,
    config: &LayoutConfig,
) {
    push_rect(svg, rect, &TEXT_PANEL, 8.0, 1.0);
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{TEXT_COLOR}\">{heading}</text>\n",
        fmt_num(rect.x + config.panel_padding),
        fmt_num(heading_y),
        fmt_num(config.heading_font)
    ));
}

fn push_detail_row(svg: &mut String, row: &DetailRow, config: &LayoutConfig) {
    let detail = &row.detail;
    let x = row.rect.x + config.detail_row_padding;
    svg.push_str(&format!(
        "<g class=\"word-detail\" data-id=\"{}\">\n",
        xml_escape(&detail.id)
    ));
    push_rect(svg, &row.rect, &DETAIL_ROW, 4.0, 0.0);

    let small = fmt_num(config.body_font);
    let mut head = String::new();
    if detail.is_topic {
        head.push_str(&format!(
            "<tspan font-size=\"11\" font-weight=\"600\" fill=\"{TOPIC_TAG_COLOR}\">TOPIC</tspan> "
        ));
    }
    head.push_str(&format!(
        "<tspan font-weight=\"600\">{}</tspan>",
        xml_escape(&detail.text)
    ));
    if let Some(particle) = &detail.particle {
        head.push_str(&format!(
            "<tspan font-size=\"{small}\" font-weight=\"600\" fill=\"{PARTICLE_TEXT_COLOR}\">{}</tspan>",
            xml_escape(particle)
        ));
    }
    if let Some(reading) = &detail.reading {
        head.push_str(&format!(
            " <tspan font-size=\"{small}\" fill=\"{MUTED_COLOR}\">{}</tspan>",
            xml_escape(reading)
        ));
    }
    head.push_str(&format!(
        " <tspan font-size=\"{small}\" fill=\"{POS_COLOR}\">{}</tspan>",
        xml_escape(&detail.part_of_speech)
    ));
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-size=\"{}\" fill=\"{TEXT_COLOR}\">{head}</text>\n",
        fmt_num(x),
        fmt_num(row.head_y),
        fmt_num(config.detail_font)
    ));
    push_text_lines(svg, &row.modifies_lines, x, config.body_font, MUTED_COLOR);
    svg.push_str("</g>\n");
}

/// Emit left-aligned lines whose baselines were fixed by layout.
fn push_text_lines(svg: &mut String, lines: &[TextLine], x: f64, font_size: f64, fill: &str) {
    for line in lines {
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"{}\" fill=\"{fill}\">{}</text>\n",
            fmt_num(x),
            fmt_num(line.y),
            fmt_num(font_size),
            xml_escape(&line.text)
        ));
    }
}

fn push_word(
    svg: &mut String,
    analysis: &SentenceAnalysis,
    word_box: &WordBox,
    style: &BoxStyle,
    config: &LayoutConfig,
) {
    let Some(word) = analysis.word(&word_box.id) else {
        return;
    };
    let rect = &word_box.rect;
    let metrics = &word_box.metrics;
    let cx = fmt_num(rect.center_x());

    svg.push_str(&format!(
        "<g class=\"word\" data-id=\"{}\">\n",
        xml_escape(&word_box.id)
    ));
    push_rect(svg, rect, style, 8.0, config.box_border);

    let mut cursor = rect.y + config.box_border + config.box_padding;
    cursor = push_lines(
        svg,
        &metrics.text_lines,
        &cx,
        cursor,
        config.text_font,
        TEXT_COLOR,
        config,
    );
    cursor += 4.0;
    if !metrics.reading_lines.is_empty() {
        cursor = push_lines(
            svg,
            &metrics.reading_lines,
            &cx,
            cursor,
            config.reading_font,
            MUTED_COLOR,
            config,
        );
        cursor += 8.0;
    }
    push_lines(
        svg,
        &metrics.pos_lines,
        &cx,
        cursor,
        config.pos_font,
        POS_COLOR,
        config,
    );

    if let (Some(chip), Some(particle)) = (&word_box.particle, &word.attached_particle) {
        svg.push_str("<g class=\"particle\">\n");
        if !particle.description.is_empty() {
            svg.push_str(&format!(
                "<title>{}</title>\n",
                xml_escape(&plain_text(&particle.description))
            ));
        }
        push_rect(svg, chip, &PARTICLE_BOX, 6.0, config.box_border);
        let chip_cx = fmt_num(chip.center_x());
        let top = chip.y + config.box_border + config.particle_padding_y;
        let next = push_lines(
            svg,
            std::slice::from_ref(&particle.text),
            &chip_cx,
            top,
            config.particle_font,
            "#9a3412",
            config,
        );
        if let Some(reading) = &metrics.particle_reading {
            push_lines(
                svg,
                std::slice::from_ref(reading),
                &chip_cx,
                next,
                config.particle_reading_font,
                "#c2410c",
                config,
            );
        }
        svg.push_str("</g>\n");
    }
    svg.push_str("</g>\n");
}

fn push_rect(svg: &mut String, rect: &Rect, style: &BoxStyle, radius: f64, border: f64) {
    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
        fmt_num(rect.x),
        fmt_num(rect.y),
        fmt_num(rect.width),
        fmt_num(rect.height),
        fmt_num(radius),
        style.fill,
        style.stroke,
        fmt_num(border)
    ));
}

/// Emit centered text lines starting at `top`; returns the y after the last.
fn push_lines(
    svg: &mut String,
    lines: &[String],
    cx: &str,
    top: f64,
    font_size: f64,
    fill: &str,
    config: &LayoutConfig,
) -> f64 {
    let mut y = top;
    for line in lines {
        let baseline = config.baseline(y, font_size);
        svg.push_str(&format!(
            "<text x=\"{cx}\" y=\"{}\" font-size=\"{}\" text-anchor=\"middle\" fill=\"{fill}\">{}</text>\n",
            fmt_num(baseline),
            fmt_num(font_size),
            xml_escape(line)
        ));
        y += config.line_px(font_size);
    }
    y
}

fn push_connector(svg: &mut String, connector: &Connector) {
    svg.push_str(&format!(
        "<path class=\"connector\" data-from=\"{}\" data-to=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{CONNECTOR_COLOR}\" stroke-width=\"2\"/>\n",
        xml_escape(&connector.from),
        xml_escape(&connector.to),
        connector.path_data()
    ));
    svg.push_str(&format!(
        "<polygon points=\"{}\" fill=\"{CONNECTOR_COLOR}\" transform=\"translate({} {}) rotate({})\"/>\n",
        Connector::arrowhead_points(),
        fmt_num(connector.end.x),
        fmt_num(connector.end.y),
        fmt_num(connector.angle_degrees())
    ));
}

/// Escape text for use in SVG element content and double-quoted attributes.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
