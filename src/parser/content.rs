//! Content stream tokenizer and graphics state machine.
//!
//! A page's content stream is replayed in a single left-to-right pass over
//! its tokens. The replay maintains one [`GraphicsState`] plus an explicit
//! stack for `q`/`Q` bracketing and emits positioned primitives: text runs,
//! straight line segments and image placements. Nothing here interprets
//! layout; that is the reconstructor's job.

use std::collections::HashMap;

use super::fonts::FontInfo;
use super::lexer::{Lexer, Token};
use super::object::Object;

/// A token of a content stream: an operand value or an operator mnemonic.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    Operand(Object),
    Operator(String),
}

/// A 2×3 affine transform in row-vector convention: `[x y 1] · M`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self · other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Magnitude of the transformed vertical unit vector; scales font sizes.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Snapshot-copyable drawing state.
///
/// A stack of these models `q`/`Q`; the stack never pops below its starting
/// depth, unbalanced restores are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub text_matrix: Matrix,
    pub text_line_matrix: Matrix,
    pub font_name: Option<String>,
    pub font_size: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    pub leading: Option<f32>,
    pub text_rise: f32,
    pub fill_color: [f32; 3],
    pub stroke_color: [f32; 3],
    pub line_width: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            text_matrix: Matrix::IDENTITY,
            text_line_matrix: Matrix::IDENTITY,
            font_name: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: None,
            text_rise: 0.0,
            fill_color: [0.0, 0.0, 0.0],
            stroke_color: [0.0, 0.0, 0.0],
            line_width: 1.0,
        }
    }
}

/// A decoded text run at its page-space baseline origin.
#[derive(Debug, Clone)]
pub struct PositionedTextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Declared size times the transform's vertical scale.
    pub font_size: f32,
    pub color: [f32; 3],
    pub bold: bool,
    pub italic: bool,
    /// Set later by the layout pass from nearby line segments.
    pub underline: bool,
    pub strikethrough: bool,
    /// Raw text rise; positive is superscript, negative subscript.
    pub rise: f32,
    /// Base name of the owning font.
    pub font: String,
}

/// A page-space straight line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Axis tolerance: a segment is horizontal/vertical when the delta on the
/// other axis stays below this.
const AXIS_TOLERANCE: f32 = 0.5;

impl LineSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_horizontal(&self) -> bool {
        (self.y2 - self.y1).abs() < AXIS_TOLERANCE
    }

    pub fn is_vertical(&self) -> bool {
        (self.x2 - self.x1).abs() < AXIS_TOLERANCE
    }

    pub fn min_x(&self) -> f32 {
        self.x1.min(self.x2)
    }

    pub fn max_x(&self) -> f32 {
        self.x1.max(self.x2)
    }

    pub fn min_y(&self) -> f32 {
        self.y1.min(self.y2)
    }

    pub fn max_y(&self) -> f32 {
        self.y1.max(self.y2)
    }
}

/// An image drawn via `Do`, with its page-space footprint.
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    /// XObject resource name.
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything one content stream replay produces.
#[derive(Debug, Default)]
pub struct ReplayOutput {
    pub texts: Vec<PositionedTextRun>,
    pub segments: Vec<LineSegment>,
    pub images: Vec<ImagePlacement>,
    pub warnings: Vec<String>,
}

/// Fraction of the font size used as average glyph advance when no metrics
/// are available.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;
/// Leading assumed by `T*` when none was set explicitly.
const DEFAULT_LEADING_FACTOR: f32 = 1.2;

/// Tokenize content stream bytes into a flat operand/operator sequence.
///
/// Inline image payloads (`BI … ID … EI`) are skipped byte-wise during
/// tokenization since their binary data would desynchronize the lexer.
pub fn tokenize(bytes: &[u8]) -> Vec<ContentToken> {
    let mut lexer = Lexer::new(bytes);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        match token {
            Token::Keyword(kw) if kw == "ID" => {
                lexer.skip_inline_image_data();
                tokens.push(ContentToken::Operator("ID".to_string()));
            }
            Token::Keyword(kw) => tokens.push(ContentToken::Operator(kw)),
            other => match operand_from_token(other, &mut lexer) {
                Some(value) => tokens.push(ContentToken::Operand(value)),
                None => {}
            },
        }
    }
    tokens
}

fn operand_from_token(token: Token, lexer: &mut Lexer<'_>) -> Option<Object> {
    match token {
        Token::Null => Some(Object::Null),
        Token::Boolean(v) => Some(Object::Boolean(v)),
        Token::Integer(v) => Some(Object::Integer(v)),
        Token::Real(v) => Some(Object::Real(v)),
        // Literal and hex strings both carry raw code bytes by this point.
        Token::String(v) | Token::HexString(v) => Some(Object::String(v)),
        Token::Name(v) => Some(Object::Name(v)),
        Token::ArrayStart => {
            let mut items = Vec::new();
            while let Some(token) = lexer.next_token() {
                if token == Token::ArrayEnd {
                    break;
                }
                if let Some(value) = operand_from_token(token, lexer) {
                    items.push(value);
                }
            }
            Some(Object::Array(items))
        }
        Token::DictStart => {
            let mut dict = HashMap::new();
            loop {
                let key = match lexer.next_token() {
                    Some(Token::Name(v)) => v,
                    Some(Token::DictEnd) | None => break,
                    Some(_) => continue,
                };
                match lexer.next_token() {
                    Some(Token::DictEnd) | None => break,
                    Some(token) => {
                        if let Some(value) = operand_from_token(token, lexer) {
                            dict.insert(key, value);
                        }
                    }
                }
            }
            Some(Object::Dictionary(dict))
        }
        Token::Keyword(_) | Token::ArrayEnd | Token::DictEnd => None,
    }
}

/// Replay a token sequence against a fresh graphics state.
///
/// `fonts` maps resource names to resolved font information; `xobjects`
/// names the image XObjects available on the page, so `Do` invocations of
/// forms are ignored silently.
pub fn replay(
    tokens: &[ContentToken],
    fonts: &HashMap<String, FontInfo>,
    xobjects: &HashMap<String, bool>,
) -> ReplayOutput {
    Replayer::new(fonts, xobjects).run(tokens)
}

struct Replayer<'a> {
    fonts: &'a HashMap<String, FontInfo>,
    xobjects: &'a HashMap<String, bool>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    out: ReplayOutput,
    // Path construction state.
    current_point: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl<'a> Replayer<'a> {
    fn new(fonts: &'a HashMap<String, FontInfo>, xobjects: &'a HashMap<String, bool>) -> Self {
        Self {
            fonts,
            xobjects,
            state: GraphicsState::default(),
            stack: Vec::new(),
            out: ReplayOutput::default(),
            current_point: None,
            subpath_start: None,
        }
    }

    fn run(mut self, tokens: &[ContentToken]) -> ReplayOutput {
        let mut operands: Vec<Object> = Vec::new();
        for token in tokens {
            match token {
                ContentToken::Operand(value) => operands.push(value.clone()),
                ContentToken::Operator(op) => {
                    self.apply(op, &operands);
                    operands.clear();
                }
            }
        }
        self.out
    }

    fn apply(&mut self, op: &str, operands: &[Object]) {
        match op {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                // Unbalanced restores in damaged streams are ignored.
                if let Some(prev) = self.stack.pop() {
                    self.state = prev;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "w" => {
                if let Some(width) = number(operands, 0) {
                    self.state.line_width = width;
                }
            }

            // Text object and positioning.
            "BT" => {
                self.state.text_matrix = Matrix::IDENTITY;
                self.state.text_line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.state.font_name = Some(name.clone());
                }
                if let Some(size) = number(operands, 1) {
                    self.state.font_size = size;
                }
            }
            "Td" => self.move_text_line(number(operands, 0), number(operands, 1)),
            "TD" => {
                if let Some(ty) = number(operands, 1) {
                    self.state.leading = Some(-ty);
                }
                self.move_text_line(number(operands, 0), number(operands, 1));
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.text_matrix = m;
                    self.state.text_line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "TL" => {
                if let Some(leading) = number(operands, 0) {
                    self.state.leading = Some(leading);
                }
            }
            "Tc" => {
                if let Some(v) = number(operands, 0) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = number(operands, 0) {
                    self.state.word_spacing = v;
                }
            }
            "Ts" => {
                if let Some(v) = number(operands, 0) {
                    self.state.text_rise = v;
                }
            }

            // Text showing.
            "Tj" => {
                if let Some(bytes) = string_operand(operands, 0) {
                    self.show_text(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = string_operand(operands, 0) {
                    self.show_text(bytes);
                }
            }
            "\"" => {
                if let Some(aw) = number(operands, 0) {
                    self.state.word_spacing = aw;
                }
                if let Some(ac) = number(operands, 1) {
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(bytes) = string_operand(operands, 2) {
                    self.show_text(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes) => self.show_text(bytes),
                            _ => {
                                if let Some(adjust) = item.as_f64() {
                                    let shift =
                                        -(adjust as f32) * 0.001 * self.state.font_size;
                                    self.state.text_matrix = Matrix::translation(shift, 0.0)
                                        .then(&self.state.text_matrix);
                                }
                            }
                        }
                    }
                }
            }

            // Path construction: straight segments feed table and
            // decoration detection, curves only move the point.
            "m" => {
                if let (Some(x), Some(y)) = (number(operands, 0), number(operands, 1)) {
                    self.current_point = Some((x, y));
                    self.subpath_start = Some((x, y));
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (number(operands, 0), number(operands, 1)) {
                    if let Some((px, py)) = self.current_point {
                        self.emit_segment(px, py, x, y);
                    }
                    self.current_point = Some((x, y));
                }
            }
            "c" | "v" | "y" => {
                let coords: Vec<f32> = operands.iter().filter_map(|o| o.as_f64()).map(|v| v as f32).collect();
                if coords.len() >= 2 {
                    let x = coords[coords.len() - 2];
                    let y = coords[coords.len() - 1];
                    self.current_point = Some((x, y));
                }
            }
            "h" => {
                if let (Some((px, py)), Some((sx, sy))) = (self.current_point, self.subpath_start) {
                    self.emit_segment(px, py, sx, sy);
                    self.current_point = Some((sx, sy));
                }
            }
            "re" => {
                let coords: Vec<f32> = operands.iter().filter_map(|o| o.as_f64()).map(|v| v as f32).collect();
                if coords.len() >= 4 {
                    let (x, y, w, h) = (coords[0], coords[1], coords[2], coords[3]);
                    self.emit_segment(x, y, x + w, y);
                    self.emit_segment(x + w, y, x + w, y + h);
                    self.emit_segment(x + w, y + h, x, y + h);
                    self.emit_segment(x, y + h, x, y);
                    self.current_point = Some((x, y));
                    self.subpath_start = Some((x, y));
                }
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                self.current_point = None;
                self.subpath_start = None;
            }

            // Color.
            "rg" => self.state.fill_color = rgb(operands),
            "RG" => self.state.stroke_color = rgb(operands),
            "g" => self.state.fill_color = gray(operands),
            "G" => self.state.stroke_color = gray(operands),

            // External objects. Forms are ignored; a name with no resource
            // entry at all is worth reporting.
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    match self.xobjects.get(name) {
                        Some(true) => self.place_image(name.clone()),
                        Some(false) => {}
                        None => self
                            .out
                            .warnings
                            .push(format!("XObject /{} not found in page resources", name)),
                    }
                }
            }

            // Inline images were skipped at tokenize time.
            "BI" | "ID" | "EI" => {}

            _ => {}
        }
    }

    fn move_text_line(&mut self, tx: Option<f32>, ty: Option<f32>) {
        let (tx, ty) = (tx.unwrap_or(0.0), ty.unwrap_or(0.0));
        self.state.text_line_matrix =
            Matrix::translation(tx, ty).then(&self.state.text_line_matrix);
        self.state.text_matrix = self.state.text_line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self
            .state
            .leading
            .unwrap_or(self.state.font_size * DEFAULT_LEADING_FACTOR);
        self.move_text_line(Some(0.0), Some(-leading));
    }

    fn show_text(&mut self, bytes: &[u8]) {
        let font = self
            .state
            .font_name
            .as_ref()
            .and_then(|name| self.fonts.get(name));
        let text = super::fonts::decode_string(font, bytes);

        // Position comes from the matrices at the moment of this operator.
        let trm = self.state.text_matrix.then(&self.state.ctm);
        let effective_size = self.state.font_size * trm.vertical_scale();

        if !text.trim().is_empty() {
            self.out.texts.push(PositionedTextRun {
                text: text.clone(),
                x: trm.e,
                y: trm.f,
                font_size: effective_size,
                color: self.state.fill_color,
                bold: font.map(|f| f.bold).unwrap_or(false),
                italic: font.map(|f| f.italic).unwrap_or(false),
                underline: false,
                strikethrough: false,
                rise: self.state.text_rise,
                font: font
                    .map(|f| f.base_name.clone())
                    .or_else(|| self.state.font_name.clone())
                    .unwrap_or_default(),
            });
        }

        // Advance past the shown string so later runs keep their place:
        // estimated glyph advance plus character spacing.
        let mut char_count = text.chars().count();
        if char_count == 0 {
            char_count = if font.map(|f| f.composite).unwrap_or(false) {
                bytes.len() / 2
            } else {
                bytes.len()
            };
        }
        let advance = char_count as f32
            * (self.state.font_size * GLYPH_WIDTH_FACTOR + self.state.char_spacing);
        self.state.text_matrix =
            Matrix::translation(advance, 0.0).then(&self.state.text_matrix);
    }

    fn emit_segment(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let (x1, y1) = self.state.ctm.apply(x1, y1);
        let (x2, y2) = self.state.ctm.apply(x2, y2);
        self.out.segments.push(LineSegment::new(x1, y1, x2, y2));
    }

    fn place_image(&mut self, name: String) {
        // An image XObject occupies the CTM's image of the unit square.
        let (x0, y0) = self.state.ctm.apply(0.0, 0.0);
        let (x1, y1) = self.state.ctm.apply(1.0, 1.0);
        self.out.images.push(ImagePlacement {
            name,
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        });
    }
}

fn number(operands: &[Object], index: usize) -> Option<f32> {
    operands.get(index).and_then(|o| o.as_f64()).map(|v| v as f32)
}

fn string_operand<'a>(operands: &'a [Object], index: usize) -> Option<&'a [u8]> {
    match operands.get(index) {
        Some(Object::String(v)) => Some(v),
        _ => None,
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut values = [0.0f32; 6];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = operand.as_f64()? as f32;
    }
    Some(Matrix::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}

fn rgb(operands: &[Object]) -> [f32; 3] {
    [
        number(operands, 0).unwrap_or(0.0),
        number(operands, 1).unwrap_or(0.0),
        number(operands, 2).unwrap_or(0.0),
    ]
}

fn gray(operands: &[Object]) -> [f32; 3] {
    let level = number(operands, 0).unwrap_or(0.0);
    [level, level, level]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay_bytes(bytes: &[u8]) -> ReplayOutput {
        let fonts = HashMap::new();
        let xobjects = HashMap::new();
        replay(&tokenize(bytes), &fonts, &xobjects)
    }

    #[test]
    fn test_save_restore_round_trip() {
        let fonts = HashMap::new();
        let xobjects = HashMap::new();
        let mut replayer = Replayer::new(&fonts, &xobjects);
        let before = replayer.state.clone();
        let mut operands: Vec<Object> = Vec::new();
        for token in tokenize(b"q 2 0 0 2 10 10 cm 0.5 g 3 w Q") {
            match token {
                ContentToken::Operand(v) => operands.push(v),
                ContentToken::Operator(op) => {
                    replayer.apply(&op, &operands);
                    operands.clear();
                }
            }
        }
        assert_eq!(replayer.state, before);
        assert!(replayer.stack.is_empty());
    }

    #[test]
    fn test_unbalanced_restore_ignored() {
        let out = replay_bytes(b"Q Q 10 0 0 10 0 0 cm 0 0 m 5 0 l S");
        // Still produces the segment scaled by the transform.
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].x2, 50.0);
    }

    #[test]
    fn test_rectangle_yields_square() {
        let out = replay_bytes(b"0 0 10 10 re S");
        assert_eq!(out.segments.len(), 4);
        let horizontal: Vec<_> = out.segments.iter().filter(|s| s.is_horizontal()).collect();
        let vertical: Vec<_> = out.segments.iter().filter(|s| s.is_vertical()).collect();
        assert_eq!(horizontal.len(), 2);
        assert_eq!(vertical.len(), 2);
        assert!(out
            .segments
            .iter()
            .all(|s| s.min_x() >= 0.0 && s.max_x() <= 10.0 && s.min_y() >= 0.0 && s.max_y() <= 10.0));
    }

    #[test]
    fn test_rectangle_transformed_by_ctm() {
        let out = replay_bytes(b"2 0 0 2 100 0 cm 0 0 10 10 re S");
        assert_eq!(out.segments.len(), 4);
        assert!((out.segments[0].x1 - 100.0).abs() < 1e-5);
        assert!((out.segments[1].x1 - 120.0).abs() < 1e-5);
    }

    #[test]
    fn test_text_position_and_size() {
        let out = replay_bytes(b"BT /F1 12 Tf 2 0 0 2 50 700 Tm (Hi) Tj ET");
        assert_eq!(out.texts.len(), 1);
        let run = &out.texts[0];
        assert_eq!(run.text, "Hi");
        assert_eq!(run.x, 50.0);
        assert_eq!(run.y, 700.0);
        assert_eq!(run.font_size, 24.0);
    }

    #[test]
    fn test_td_positions_relative_to_line() {
        let out = replay_bytes(b"BT /F1 10 Tf 10 700 Td (a) Tj 0 -20 Td (b) Tj ET");
        assert_eq!(out.texts.len(), 2);
        assert_eq!(out.texts[0].y, 700.0);
        assert_eq!(out.texts[1].y, 680.0);
        // Second Td resets x relative to the line start, not the pen.
        assert_eq!(out.texts[1].x, 10.0);
    }

    #[test]
    fn test_show_text_advances_pen() {
        let out = replay_bytes(b"BT /F1 10 Tf 0 0 Td (abcd) Tj (e) Tj ET");
        assert_eq!(out.texts.len(), 2);
        // Four glyphs at 0.5 * 10pt each.
        assert_eq!(out.texts[1].x, 20.0);
    }

    #[test]
    fn test_tj_array_adjustments_shift_pen() {
        let out = replay_bytes(b"BT /F1 10 Tf 0 0 Td [(ab) -1000 (cd)] TJ ET");
        assert_eq!(out.texts.len(), 2);
        // Two glyphs advance 10, adjustment adds 1000 * 0.001 * 10 = 10.
        assert_eq!(out.texts[1].x, 20.0);
    }

    #[test]
    fn test_t_star_uses_default_leading() {
        let out = replay_bytes(b"BT /F1 10 Tf 0 100 Td (a) Tj T* (b) Tj ET");
        assert_eq!(out.texts[1].y, 100.0 - 12.0);
    }

    #[test]
    fn test_fill_color_carried_onto_runs() {
        let out = replay_bytes(b"BT /F1 10 Tf 1 0 0 rg 0 0 Td (x) Tj ET");
        assert_eq!(out.texts[0].color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_image_placement_from_ctm() {
        let mut xobjects = HashMap::new();
        xobjects.insert("Im1".to_string(), true);
        let fonts = HashMap::new();
        let out = replay(
            &tokenize(b"q 120 0 0 80 36 500 cm /Im1 Do Q"),
            &fonts,
            &xobjects,
        );
        assert_eq!(out.images.len(), 1);
        let image = &out.images[0];
        assert_eq!(image.name, "Im1");
        assert_eq!(image.x, 36.0);
        assert_eq!(image.y, 500.0);
        assert_eq!(image.width, 120.0);
        assert_eq!(image.height, 80.0);
    }

    #[test]
    fn test_form_xobject_ignored() {
        let mut xobjects = HashMap::new();
        xobjects.insert("Fm1".to_string(), false);
        let fonts = HashMap::new();
        let out = replay(&tokenize(b"/Fm1 Do"), &fonts, &xobjects);
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_inline_image_does_not_derail() {
        let out = replay_bytes(b"BI /W 2 /H 2 ID \xff\x00\xfe\x01 EI BT /F1 10 Tf 0 0 Td (ok) Tj ET");
        assert_eq!(out.texts.len(), 1);
        assert_eq!(out.texts[0].text, "ok");
    }

    #[test]
    fn test_text_rise_recorded() {
        let out = replay_bytes(b"BT /F1 10 Tf 0 0 Td 3 Ts (sup) Tj ET");
        assert_eq!(out.texts[0].rise, 3.0);
    }
}
