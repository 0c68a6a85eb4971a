use std::collections::VecDeque;
use crate::terminal::colors::TerminalColor;

const SCROLLBACK_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg_color: TerminalColor,
    pub bg_color: TerminalColor,
    pub attrs: CellAttributes,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg_color: TerminalColor::DefaultFg,
            bg_color: TerminalColor::DefaultBg,
            attrs: CellAttributes::default(),
        }
    }
}

impl Cell {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellAttributes {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub blink: bool,
    pub reverse: bool,
}

pub struct TextGrid {
    pub rows: u16,
    pub cols: u16,
    cells: Vec<Vec<Cell>>,
    scrollback: VecDeque<Vec<Cell>>,
    cursor_row: u16,
    // May equal `cols` while a wrap is pending.
    cursor_col: u16,
    cursor_visible: bool,
    current_attrs: CellAttributes,
    current_fg: TerminalColor,
    current_bg: TerminalColor,
}

impl TextGrid {
    pub fn new(rows: u16, cols: u16) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);

        Self {
            rows,
            cols,
            cells: vec![vec![Cell::empty(); cols as usize]; rows as usize],
            scrollback: VecDeque::new(),
            cursor_row: 0,
            cursor_col: 0,
            cursor_visible: true,
            current_attrs: CellAttributes::default(),
            current_fg: TerminalColor::DefaultFg,
            current_bg: TerminalColor::DefaultBg,
        }
    }

    pub fn resize(&mut self, new_rows: u16, new_cols: u16) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.max(1);
        if new_rows == self.rows && new_cols == self.cols {
            return;
        }

        for row in &mut self.cells {
            row.resize(new_cols as usize, Cell::empty());
        }

        // Shrinking pushes the top rows into scrollback so the cursor row survives.
        while self.cells.len() > new_rows as usize {
            let top = self.cells.remove(0);
            self.push_scrollback(top);
            self.cursor_row = self.cursor_row.saturating_sub(1);
        }
        while self.cells.len() < new_rows as usize {
            self.cells.push(vec![Cell::empty(); new_cols as usize]);
        }

        self.rows = new_rows;
        self.cols = new_cols;
        self.cursor_row = self.cursor_row.min(new_rows - 1);
        self.cursor_col = self.cursor_col.min(new_cols - 1);
    }

    pub fn write_char(&mut self, ch: char) {
        if self.cursor_col >= self.cols {
            self.newline();
        }

        self.cells[self.cursor_row as usize][self.cursor_col as usize] = Cell {
            ch,
            fg_color: self.current_fg,
            bg_color: self.current_bg,
            attrs: self.current_attrs.clone(),
        };
        self.cursor_col += 1;
    }

    /// Line feed plus carriage return, scrolling at the bottom edge.
    pub fn newline(&mut self) {
        self.cursor_col = 0;
        self.line_feed();
    }

    pub fn line_feed(&mut self) {
        if self.cursor_row + 1 >= self.rows {
            self.scroll_up(1);
        } else {
            self.cursor_row += 1;
        }
        if self.cursor_col >= self.cols {
            self.cursor_col = self.cols - 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor_col = 0;
    }

    pub fn tab(&mut self) {
        // Move to next tab stop (every 8 characters)
        let next_tab = ((self.cursor_col / 8) + 1) * 8;
        self.cursor_col = next_tab.min(self.cols - 1);
    }

    pub fn backspace(&mut self) {
        if self.cursor_col >= self.cols {
            self.cursor_col = self.cols - 1;
        }
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        for _ in 0..lines {
            let top_line = self.cells.remove(0);
            self.push_scrollback(top_line);
            self.cells.push(vec![Cell::empty(); self.cols as usize]);
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        for _ in 0..lines {
            self.cells.pop();
            self.cells.insert(0, vec![Cell::empty(); self.cols as usize]);
        }
    }

    fn push_scrollback(&mut self, line: Vec<Cell>) {
        self.scrollback.push_back(line);
        if self.scrollback.len() > SCROLLBACK_LIMIT {
            self.scrollback.pop_front();
        }
    }

    // Cursor movement methods
    pub fn cursor_up(&mut self, lines: u16) {
        self.cursor_row = self.cursor_row.saturating_sub(lines);
    }

    pub fn cursor_down(&mut self, lines: u16) {
        self.cursor_row = self.cursor_row.saturating_add(lines).min(self.rows - 1);
    }

    pub fn cursor_left(&mut self, cols: u16) {
        self.cursor_col = self.cursor_col.min(self.cols - 1).saturating_sub(cols);
    }

    pub fn cursor_right(&mut self, cols: u16) {
        self.cursor_col = self.cursor_col.saturating_add(cols).min(self.cols - 1);
    }

    pub fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor_row = row.min(self.rows - 1);
        self.cursor_col = col.min(self.cols - 1);
    }

    /// `(row, col)`, zero-based and always inside the grid.
    pub fn cursor_position(&self) -> (u16, u16) {
        (self.cursor_row, self.cursor_col.min(self.cols - 1))
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    // Screen clearing methods
    pub fn clear_screen(&mut self) {
        for row in &mut self.cells {
            for cell in row {
                *cell = Cell::empty();
            }
        }
    }

    pub fn clear_below(&mut self) {
        self.clear_line_from_cursor();
        for row in self.cells.iter_mut().skip(self.cursor_row as usize + 1) {
            for cell in row {
                *cell = Cell::empty();
            }
        }
    }

    pub fn clear_above(&mut self) {
        for row in self.cells.iter_mut().take(self.cursor_row as usize) {
            for cell in row {
                *cell = Cell::empty();
            }
        }
        self.clear_line_to_cursor();
    }

    pub fn clear_scrollback(&mut self) {
        self.scrollback.clear();
    }

    /// Wipe the viewport and scrollback and home the cursor.
    pub fn reset(&mut self) {
        self.clear_screen();
        self.clear_scrollback();
        self.cursor_row = 0;
        self.cursor_col = 0;
    }

    pub fn clear_line(&mut self) {
        for cell in &mut self.cells[self.cursor_row as usize] {
            *cell = Cell::empty();
        }
    }

    pub fn clear_line_from_cursor(&mut self) {
        let start = self.cursor_col as usize;
        for cell in self.cells[self.cursor_row as usize].iter_mut().skip(start) {
            *cell = Cell::empty();
        }
    }

    pub fn clear_line_to_cursor(&mut self) {
        let end = self.cursor_col as usize;
        for cell in self.cells[self.cursor_row as usize].iter_mut().take(end + 1) {
            *cell = Cell::empty();
        }
    }

    // Attribute and color methods
    pub fn set_attrs(&mut self, attrs: CellAttributes) {
        self.current_attrs = attrs;
    }

    pub fn set_fg_color(&mut self, color: TerminalColor) {
        self.current_fg = color;
    }

    pub fn set_bg_color(&mut self, color: TerminalColor) {
        self.current_bg = color;
    }

    // Access methods
    pub fn cell_at(&self, row: u16, col: u16) -> Option<&Cell> {
        self.cells
            .get(row as usize)?
            .get(col as usize)
    }

    /// Text of one viewport row with trailing blanks removed.
    pub fn row_text(&self, index: u16) -> Option<String> {
        self.cells.get(index as usize).map(|row| line_text(row))
    }

    /// The whole viewport, one line per row, trailing blank rows dropped.
    pub fn screen_text(&self) -> String {
        let mut lines: Vec<String> = self.cells.iter().map(|row| line_text(row)).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }
}

fn line_text(row: &[Cell]) -> String {
    let text: String = row
        .iter()
        .map(|c| if c.ch == '\0' { ' ' } else { c.ch })
        .collect();
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = TextGrid::new(24, 80);
        assert_eq!(grid.rows, 24);
        assert_eq!(grid.cols, 80);
        assert_eq!(grid.cursor_position(), (0, 0));
    }

    #[test]
    fn test_write_char() {
        let mut grid = TextGrid::new(24, 80);
        grid.write_char('H');
        grid.write_char('i');

        assert_eq!(grid.cell_at(0, 0).unwrap().ch, 'H');
        assert_eq!(grid.cell_at(0, 1).unwrap().ch, 'i');
        assert_eq!(grid.cursor_position(), (0, 2));
    }

    #[test]
    fn test_wraps_at_right_edge() {
        let mut grid = TextGrid::new(3, 4);
        for ch in "abcdef".chars() {
            grid.write_char(ch);
        }
        assert_eq!(grid.row_text(0).unwrap(), "abcd");
        assert_eq!(grid.row_text(1).unwrap(), "ef");
    }

    #[test]
    fn test_scrolls_into_scrollback() {
        let mut grid = TextGrid::new(2, 10);
        grid.write_char('1');
        grid.newline();
        grid.write_char('2');
        grid.newline();
        grid.write_char('3');

        assert_eq!(grid.screen_text(), "2\n3");
        assert_eq!(grid.scrollback_len(), 1);
    }

    #[test]
    fn test_partial_clears() {
        let mut grid = TextGrid::new(3, 5);
        for row in 0..3 {
            grid.set_cursor(row, 0);
            for ch in "xxxxx".chars() {
                grid.write_char(ch);
            }
        }
        grid.set_cursor(1, 2);
        grid.clear_below();
        assert_eq!(grid.screen_text(), "xxxxx\nxx");

        grid.set_cursor(1, 1);
        grid.clear_above();
        assert_eq!(grid.screen_text(), "");
    }

    #[test]
    fn test_resize() {
        let mut grid = TextGrid::new(24, 80);
        grid.write_char('X');
        grid.resize(30, 100);

        assert_eq!(grid.rows, 30);
        assert_eq!(grid.cols, 100);
        assert_eq!(grid.cell_at(0, 0).unwrap().ch, 'X');
    }
}
