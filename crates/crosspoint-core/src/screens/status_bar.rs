//! Reader chrome: the bottom status line and the indexing banner.

use embedded_graphics::pixelcolor::BinaryColor;

use crate::display::{DisplayDevice, FontRole, FontStyle, TextShaper};
use crate::error::ReaderError;
use crate::layout::truncate_title;
use crate::renderer::{Renderer, MARGIN_LEFT, MARGIN_TOP};

/// Top of the status text, relative to the page area.
const STATUS_Y: i32 = 765;
const BATTERY_Y: i32 = 772;
const BATTERY_WIDTH: i32 = 15;
const BATTERY_HEIGHT: i32 = 10;
const PERCENT_X: i32 = 20;
const TITLE_PADDING: i32 = 30;

const BANNER_TEXT: &str = "Indexing...";
const BANNER_Y: i32 = 50;
const BANNER_PADDING: u32 = 20;
const BANNER_INSET: u32 = 5;

pub(crate) struct StatusLine<'a> {
    pub page: usize,
    pub page_count: usize,
    pub battery_percent: u8,
    pub title: &'a str,
}

fn small_width<D, S>(renderer: &Renderer<D, S>, text: &str) -> i32
where
    D: DisplayDevice,
    S: TextShaper,
{
    renderer.text_width(text, FontRole::Small, FontStyle::Regular) as i32
}

/// Draw progress, battery and chapter title along the bottom edge.
pub(crate) fn draw_status_bar<D, S>(
    renderer: &mut Renderer<D, S>,
    status: &StatusLine<'_>,
) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    let left = MARGIN_LEFT as i32;
    let top = MARGIN_TOP as i32;
    let page_width = renderer.page_width() as i32;
    let text_y = top + STATUS_Y;

    let progress = format!("{} / {}", status.page + 1, status.page_count);
    let progress_width = small_width(renderer, &progress);
    draw_small(renderer, left + page_width - progress_width, text_y, &progress)?;

    let percent = format!("{}%", status.battery_percent);
    let percent_width = small_width(renderer, &percent);
    draw_small(renderer, left + PERCENT_X, text_y, &percent)?;

    draw_battery(renderer, left, top + BATTERY_Y, status.battery_percent)?;

    let title_left = PERCENT_X + percent_width + TITLE_PADDING;
    let title_right = progress_width + TITLE_PADDING;
    let available = (page_width - title_left - title_right).max(0);
    let title = truncate_title(status.title, available as u32, |text| {
        small_width(renderer, text) as u32
    });
    if !title.is_empty() {
        let title_width = small_width(renderer, &title);
        draw_small(
            renderer,
            left + title_left + (available - title_width) / 2,
            text_y,
            &title,
        )?;
    }
    Ok(())
}

fn draw_small<D, S>(renderer: &mut Renderer<D, S>, x: i32, y: i32, text: &str) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    renderer.draw_text(x, y, text, FontRole::Small, FontStyle::Regular, BinaryColor::On)
}

/// 15x10 battery: body outline, three column nub, fill from the left.
fn draw_battery<D, S>(renderer: &mut Renderer<D, S>, x: i32, y: i32, percent: u8) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    let ink = BinaryColor::On;
    let body_right = x + BATTERY_WIDTH - 4;
    let bottom = y + BATTERY_HEIGHT - 1;

    renderer.draw_line((x, y), (body_right, y), ink)?;
    renderer.draw_line((x, bottom), (body_right, bottom), ink)?;
    renderer.draw_line((x, y), (x, bottom), ink)?;
    renderer.draw_line((body_right, y), (body_right, bottom), ink)?;
    for column in 1..=3 {
        renderer.draw_line((body_right + column, y + 2), (body_right + column, bottom - 2), ink)?;
    }

    let capacity = (BATTERY_WIDTH - 5) as u32;
    // +1 so even an empty battery shows one column
    let filled = (u32::from(percent.min(100)) * capacity / 100 + 1).min(capacity);
    renderer.fill_rect(x + 1, y + 1, filled, (BATTERY_HEIGHT - 2) as u32, ink)
}

/// Draw the "Indexing..." box near the top and push just that region.
pub(crate) fn draw_indexing_banner<D, S>(renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    let text_width = renderer.text_width(BANNER_TEXT, FontRole::Reader, FontStyle::Regular);
    let width = text_width + 2 * BANNER_PADDING;
    let height = renderer.line_height(FontRole::Reader) + 2 * BANNER_PADDING;
    let page_width = renderer.page_width();
    let x = MARGIN_LEFT as i32 + (page_width.saturating_sub(width) / 2) as i32;
    let y = MARGIN_TOP as i32 + BANNER_Y;

    renderer.fill_rect(x, y, width, height, BinaryColor::Off)?;
    renderer.draw_text(
        x + BANNER_PADDING as i32,
        y + BANNER_PADDING as i32,
        BANNER_TEXT,
        FontRole::Reader,
        FontStyle::Regular,
        BinaryColor::On,
    )?;
    renderer.draw_rect(
        x + BANNER_INSET as i32,
        y + BANNER_INSET as i32,
        width - 2 * BANNER_INSET,
        height - 2 * BANNER_INSET,
        BinaryColor::On,
    )?;
    renderer.flush_region(x.max(0) as u32, y.max(0) as u32, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MonoShaper;
    use crate::test_display::{Flush, TestDisplay};

    fn renderer() -> Renderer<TestDisplay, MonoShaper> {
        Renderer::new(TestDisplay::default_size(), MonoShaper)
    }

    fn status(title: &str, battery_percent: u8) -> StatusLine<'_> {
        StatusLine {
            page: 2,
            page_count: 14,
            battery_percent,
            title,
        }
    }

    #[test]
    fn status_bar_stays_in_bottom_strip() {
        let mut renderer = renderer();
        draw_status_bar(&mut renderer, &status("Chapter One", 55)).unwrap();
        let display = renderer.display();
        assert!(display.black_pixel_count() > 0);
        assert_eq!(display.black_pixel_count_in(0, 0, 480, 776), 0);
    }

    #[test]
    fn empty_battery_still_fills_one_column() {
        let mut renderer = renderer();
        draw_battery(&mut renderer, 10, 783, 0).unwrap();
        let display = renderer.display();
        // Interior columns start at x = 11
        assert_eq!(display.black_pixel_count_in(11, 784, 12, 792), 8);
        assert_eq!(display.black_pixel_count_in(12, 784, 21, 792), 0);
    }

    #[test]
    fn full_battery_fill_is_capped() {
        let mut renderer = renderer();
        draw_battery(&mut renderer, 10, 783, 100).unwrap();
        let display = renderer.display();
        assert_eq!(display.black_pixel_count_in(11, 784, 21, 792), 80);
    }

    #[test]
    fn long_title_is_truncated_between_neighbours() {
        let mut renderer = renderer();
        let long = "An Extraordinarily Long Chapter Title That Cannot Possibly Fit On The Line";
        draw_status_bar(&mut renderer, &status(long, 80)).unwrap();
        let display = renderer.display();
        // "80%" ends at 30 + 18 and "3 / 14" starts at 470 - 36
        assert_eq!(display.black_pixel_count_in(49, 776, 78, 790), 0);
        assert_eq!(display.black_pixel_count_in(405, 776, 434, 790), 0);
    }

    #[test]
    fn banner_flushes_only_its_region() {
        let mut renderer = renderer();
        draw_indexing_banner(&mut renderer).unwrap();
        let display = renderer.display();
        // 11 glyphs of 9 px plus padding on a 460 px page
        let width = 99 + 40;
        let x = 10 + (460 - width) / 2;
        assert_eq!(
            display.last_flush(),
            Some(Flush::Region {
                x,
                y: 61,
                width,
                height: 18 + 40,
            })
        );
        assert_eq!(display.pixel(x + 5, 66), Some(BinaryColor::On));
        assert_eq!(display.black_pixel_count_in(0, 0, 480, 61), 0);
    }
}
