//! Virtual character LCD for the interface controller.
//!
//! A 2-row × 16-column cell grid with a write cursor, matching the
//! HD44780-style panel the interface node drives. Only printable ASCII
//! (0x20-0x7E) is accepted; the panel has no other glyphs.
//!
//! Writes past the last column are dropped rather than wrapped. Every change
//! is published as a frame so a simulator can render the panel.
//!
//! ```
//! use twinlock_controller::VirtualLcd;
//! use twinlock_hardware::DisplayDevice;
//!
//! let mut lcd = VirtualLcd::new();
//! lcd.display_string("ENTER PASSWORD").unwrap();
//! lcd.go_to_row_column(1, 0).unwrap();
//! lcd.display_string("***").unwrap();
//!
//! assert_eq!(lcd.lines(), vec!["ENTER PASSWORD", "***"]);
//! ```

use tokio::sync::watch;
use twinlock_hardware::{DisplayDevice, HardwareError, Result};

/// Rows on the panel.
pub const LCD_ROWS: usize = 2;

/// Columns per row.
pub const LCD_COLUMNS: usize = 16;

/// Virtual 2×16 LCD.
#[derive(Debug)]
pub struct VirtualLcd {
    cells: [[u8; LCD_COLUMNS]; LCD_ROWS],
    row: usize,
    column: usize,
    frames: watch::Sender<Vec<String>>,
}

impl VirtualLcd {
    pub fn new() -> Self {
        let (frames, _) = watch::channel(vec![String::new(); LCD_ROWS]);
        Self {
            cells: [[b' '; LCD_COLUMNS]; LCD_ROWS],
            row: 0,
            column: 0,
            frames,
        }
    }

    /// Contents of `row` without trailing blanks.
    ///
    /// # Errors
    ///
    /// Returns an error if `row` is outside the panel.
    pub fn line(&self, row: usize) -> Result<String> {
        let cells = self.cells.get(row).ok_or_else(|| {
            HardwareError::invalid_data(format!("Row {row} outside display (max {})", LCD_ROWS - 1))
        })?;
        Ok(render(cells))
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells.iter().map(|cells| render(cells)).collect()
    }

    /// Current cursor as `(row, column)`.
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    /// Receive a frame after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.frames.subscribe()
    }

    fn publish(&self) {
        self.frames.send_replace(self.lines());
    }

    fn put(&mut self, byte: u8) {
        if let Some(cell) = self.cells[self.row].get_mut(self.column) {
            *cell = byte;
            self.column += 1;
        }
    }
}

impl Default for VirtualLcd {
    fn default() -> Self {
        Self::new()
    }
}

fn render(cells: &[u8]) -> String {
    String::from_utf8_lossy(cells).trim_end().to_string()
}

fn check_printable(text: &str) -> Result<()> {
    match text.chars().find(|c| !(' '..='~').contains(c)) {
        Some(c) => Err(HardwareError::invalid_data(format!(
            "Character {c:?} is not displayable"
        ))),
        None => Ok(()),
    }
}

impl DisplayDevice for VirtualLcd {
    fn clear(&mut self) -> Result<()> {
        self.cells = [[b' '; LCD_COLUMNS]; LCD_ROWS];
        self.row = 0;
        self.column = 0;
        self.publish();
        Ok(())
    }

    fn go_to_row_column(&mut self, row: usize, column: usize) -> Result<()> {
        if row >= LCD_ROWS || column >= LCD_COLUMNS {
            return Err(HardwareError::invalid_data(format!(
                "Position ({row}, {column}) outside {LCD_ROWS}x{LCD_COLUMNS} display"
            )));
        }
        self.row = row;
        self.column = column;
        Ok(())
    }

    fn display_string(&mut self, text: &str) -> Result<()> {
        check_printable(text)?;
        for byte in text.bytes() {
            self.put(byte);
        }
        self.publish();
        Ok(())
    }

    fn display_char(&mut self, c: char) -> Result<()> {
        let mut buffer = [0u8; 4];
        self.display_string(c.encode_utf8(&mut buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_display_is_blank() {
        let lcd = VirtualLcd::new();
        assert_eq!(lcd.lines(), vec!["", ""]);
        assert_eq!(lcd.cursor(), (0, 0));
    }

    #[test]
    fn test_write_advances_cursor() {
        let mut lcd = VirtualLcd::new();
        lcd.display_string("GATE").unwrap();
        lcd.display_char('!').unwrap();

        assert_eq!(lcd.line(0).unwrap(), "GATE!");
        assert_eq!(lcd.cursor(), (0, 5));
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut lcd = VirtualLcd::new();
        lcd.display_string("UNLOCKING").unwrap();
        lcd.display_string_at(0, 0, "LOCKING").unwrap();

        assert_eq!(lcd.line(0).unwrap(), "LOCKINGNG");
    }

    #[test]
    fn test_long_text_is_cut_at_last_column() {
        let mut lcd = VirtualLcd::new();
        lcd.display_string("0123456789ABCDEFGHIJ").unwrap();

        assert_eq!(lcd.line(0).unwrap(), "0123456789ABCDEF");
        assert_eq!(lcd.line(1).unwrap(), "");
        assert_eq!(lcd.cursor(), (0, LCD_COLUMNS));
    }

    #[test]
    fn test_clear_homes_cursor() {
        let mut lcd = VirtualLcd::new();
        lcd.display_string_at(1, 3, "abc").unwrap();
        lcd.clear().unwrap();

        assert_eq!(lcd.lines(), vec!["", ""]);
        assert_eq!(lcd.cursor(), (0, 0));
    }

    #[rstest]
    #[case(2, 0)]
    #[case(0, 16)]
    #[case(5, 20)]
    fn test_position_out_of_bounds(#[case] row: usize, #[case] column: usize) {
        let mut lcd = VirtualLcd::new();
        assert!(matches!(
            lcd.go_to_row_column(row, column),
            Err(HardwareError::InvalidData { .. })
        ));
        assert_eq!(lcd.cursor(), (0, 0));
    }

    #[rstest]
    #[case("Liberação")]
    #[case("tab\there")]
    #[case("é")]
    fn test_rejects_non_printable(#[case] text: &str) {
        let mut lcd = VirtualLcd::new();
        assert!(lcd.display_string(text).is_err());
        assert_eq!(lcd.lines(), vec!["", ""]);
    }

    #[test]
    fn test_line_out_of_bounds() {
        let lcd = VirtualLcd::new();
        assert!(lcd.line(2).is_err());
    }

    #[test]
    fn test_frames_follow_writes() {
        let mut lcd = VirtualLcd::new();
        let mut frames = lcd.subscribe();

        lcd.display_string("THIEF!!!").unwrap();
        assert!(frames.has_changed().unwrap());
        assert_eq!(frames.borrow_and_update()[0], "THIEF!!!");

        lcd.go_to_row_column(1, 0).unwrap();
        assert!(!frames.has_changed().unwrap());
    }
}
