//! Reconstruction of the 'glyf' and 'loca' tables from the WOFF2
//! transformed 'glyf' table.
//!
//! <https://www.w3.org/TR/WOFF2/#glyf_table_format>

use arrayvec::ArrayVec;
use bytes::{Buf, BufMut};

use crate::bits::BitReader;
use crate::error::DecodeError;
use crate::triplet::{decode_points, Point};
use crate::variable_length::BufVariableExt as _;

// simple glyph flags
const ON_CURVE: u8 = 1 << 0;
const X_SHORT_VECTOR: u8 = 1 << 1;
const Y_SHORT_VECTOR: u8 = 1 << 2;
const REPEAT_FLAG: u8 = 1 << 3;
const X_IS_SAME_OR_POSITIVE_X_SHORT: u8 = 1 << 4;
const Y_IS_SAME_OR_POSITIVE_Y_SHORT: u8 = 1 << 5;

// composite glyph flags
const ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
const WE_HAVE_A_SCALE: u16 = 1 << 3;
const MORE_COMPONENTS: u16 = 1 << 5;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 1 << 6;
const WE_HAVE_A_TWO_BY_TWO: u16 = 1 << 7;
const WE_HAVE_INSTRUCTIONS: u16 = 1 << 8;

const TRANSFORMED_GLYF_HEADER_SIZE: usize = 36;
const NUM_SUB_STREAMS: usize = 7;

/// The two tables rebuilt from one transformed 'glyf' table.
#[derive(Debug, PartialEq)]
pub(crate) struct GlyfAndLoca {
    pub glyf: Vec<u8>,
    pub loca: Vec<u8>,
}

/// Reverse the 'glyf' transform, producing canonical 'glyf' bytes and the
/// matching 'loca' table.
pub(crate) fn reconstruct_glyf_and_loca(data: &[u8]) -> Result<GlyfAndLoca, DecodeError> {
    GlyfReconstructor::new(data)?.reconstruct()
}

/// The glyph kind, dispatched once per glyph from the contour count.
enum GlyphKind {
    Empty,
    Simple(u16),
    Composite(i16),
}

impl GlyphKind {
    fn from_contour_count(n_contours: i16) -> GlyphKind {
        if n_contours == 0 {
            GlyphKind::Empty
        } else if n_contours < 0 {
            GlyphKind::Composite(n_contours)
        } else {
            GlyphKind::Simple(n_contours as u16)
        }
    }
}

struct GlyfReconstructor<'a> {
    n_contour_stream: &'a [u8],
    n_points_stream: &'a [u8],
    flag_stream: &'a [u8],
    glyph_stream: &'a [u8],
    composite_stream: &'a [u8],
    bbox_bitmap: BitReader<'a>,
    bbox_stream: &'a [u8],
    instruction_stream: &'a [u8],
    glyph_buf: Vec<u8>,

    num_glyphs: u16,
    index_format: u16,
}

impl GlyfReconstructor<'_> {
    fn new(data: &[u8]) -> Result<GlyfReconstructor<'_>, DecodeError> {
        let mut input = data;
        let _reserved = input.try_get_u16()?;
        let _option_flags = input.try_get_u16()?;
        let num_glyphs = input.try_get_u16()?;
        let index_format = input.try_get_u16()?;

        let mut sizes: ArrayVec<usize, NUM_SUB_STREAMS> = ArrayVec::new();
        let mut total_size_of_streams: u64 = 0;
        for _ in 0..NUM_SUB_STREAMS {
            let size = input.try_get_u32()?;
            sizes.push(size as usize);
            total_size_of_streams += size as u64;
        }

        // The declared sizes must partition the bytes after the header
        // exactly.
        let remaining = data.len() - TRANSFORMED_GLYF_HEADER_SIZE;
        if total_size_of_streams != remaining as u64 {
            return Err(DecodeError::SubStreamSizeMismatch);
        }

        let (n_contour_stream, rest) = input.split_at(sizes[0]);
        let (n_points_stream, rest) = rest.split_at(sizes[1]);
        let (flag_stream, rest) = rest.split_at(sizes[2]);
        let (glyph_stream, rest) = rest.split_at(sizes[3]);
        let (composite_stream, rest) = rest.split_at(sizes[4]);
        let (bbox_stream, instruction_stream) = rest.split_at(sizes[5]);

        // The leading bytes of the bounding-box stream are a bitmap with one
        // bit per glyph, padded up to a whole number of u32 words.
        let bitmap_length = ((num_glyphs as usize + 31) >> 5) << 2;
        if bitmap_length > bbox_stream.len() {
            return Err(DecodeError::Truncated);
        }
        let (bbox_bitmap, bbox_stream) = bbox_stream.split_at(bitmap_length);

        Ok(GlyfReconstructor {
            n_contour_stream,
            n_points_stream,
            flag_stream,
            glyph_stream,
            composite_stream,
            bbox_bitmap: BitReader::new(bbox_bitmap),
            bbox_stream,
            instruction_stream,
            glyph_buf: Vec::new(),
            num_glyphs,
            index_format,
        })
    }

    fn reconstruct(mut self) -> Result<GlyfAndLoca, DecodeError> {
        let mut glyf: Vec<u8> = Vec::new();
        let mut loca_offsets: Vec<u32> = Vec::with_capacity(self.num_glyphs as usize + 1);

        for _ in 0..self.num_glyphs {
            loca_offsets.push(table_offset(glyf.len())?);

            let has_bbox = self.bbox_bitmap.read_bit()?;
            let n_contours = self.n_contour_stream.try_get_i16()?;

            self.glyph_buf.clear();
            match GlyphKind::from_contour_count(n_contours) {
                GlyphKind::Empty => {
                    // An empty glyph contributes no bytes and may not carry
                    // an explicit bounding box.
                    if has_bbox {
                        return Err(DecodeError::Malformed(
                            "empty glyph with an explicit bounding box",
                        ));
                    }
                }
                GlyphKind::Composite(n_contours) => {
                    self.reconstruct_composite_glyph(n_contours, has_bbox)?;
                }
                GlyphKind::Simple(n_contours) => {
                    self.reconstruct_simple_glyph(n_contours, has_bbox)?;
                }
            }

            glyf.extend_from_slice(&self.glyph_buf);
            // Keep every glyph record 4-byte aligned so all loca offsets
            // stay even.
            glyf.resize(align4(glyf.len()), 0);
        }
        loca_offsets.push(table_offset(glyf.len())?);

        let loca = generate_loca(&loca_offsets, self.index_format)?;
        log::debug!(
            "reconstructed {} glyphs into {} 'glyf' bytes",
            self.num_glyphs,
            glyf.len()
        );
        Ok(GlyfAndLoca { glyf, loca })
    }

    fn read_bbox(&mut self, has_bbox: bool) -> Result<[i16; 4], DecodeError> {
        if !has_bbox {
            return Ok([0; 4]);
        }
        let mut bbox = [0i16; 4];
        for value in bbox.iter_mut() {
            *value = self.bbox_stream.try_get_i16()?;
        }
        Ok(bbox)
    }

    fn reconstruct_composite_glyph(
        &mut self,
        n_contours: i16,
        has_bbox: bool,
    ) -> Result<(), DecodeError> {
        let bbox = self.read_bbox(has_bbox)?;
        self.glyph_buf.put_i16(n_contours);
        for value in bbox {
            self.glyph_buf.put_i16(value);
        }

        let mut have_instructions = false;
        loop {
            let flags = self.composite_stream.try_get_u16()?;
            have_instructions |= flags & WE_HAVE_INSTRUCTIONS != 0;

            // Glyph index plus arguments, between 4 and 14 bytes in total,
            // copied through verbatim.
            let mut argument_size: usize = 2;
            if flags & ARG_1_AND_2_ARE_WORDS != 0 {
                argument_size += 4;
            } else {
                argument_size += 2;
            }
            if flags & WE_HAVE_A_SCALE != 0 {
                argument_size += 2;
            } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                argument_size += 4;
            } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
                argument_size += 8;
            }

            self.glyph_buf.put_u16(flags);
            self.composite_stream
                .try_read_bytes_into(argument_size, &mut self.glyph_buf)?;

            if flags & MORE_COMPONENTS == 0 {
                break;
            }
        }

        if have_instructions {
            let instruction_size = self.glyph_stream.try_get_255_u16()?;
            self.glyph_buf.put_u16(instruction_size);
            self.instruction_stream
                .try_read_bytes_into(instruction_size as usize, &mut self.glyph_buf)?;
        }

        Ok(())
    }

    fn reconstruct_simple_glyph(
        &mut self,
        n_contours: u16,
        has_bbox: bool,
    ) -> Result<(), DecodeError> {
        // Per-contour point counts become endPtsOfContours by cumulative
        // sum. A prefix of zero cannot be represented (endPts entries are
        // the sum minus one).
        let mut end_pts_of_contours: Vec<u16> = Vec::with_capacity(n_contours as usize);
        let mut total_points: u16 = 0;
        for _ in 0..n_contours {
            let contour_points = self.n_points_stream.try_get_255_u16()?;
            total_points = total_points
                .checked_add(contour_points)
                .ok_or(DecodeError::Malformed("glyph point count overflows"))?;
            if total_points == 0 {
                return Err(DecodeError::Malformed("contour with no points"));
            }
            end_pts_of_contours.push(total_points - 1);
        }

        let points = decode_points(
            &mut self.flag_stream,
            &mut self.glyph_stream,
            total_points as usize,
        )?;

        let instruction_size = self.glyph_stream.try_get_255_u16()?;
        let mut instructions = Vec::with_capacity(instruction_size as usize);
        self.instruction_stream
            .try_read_bytes_into(instruction_size as usize, &mut instructions)?;

        let bbox = if has_bbox {
            self.read_bbox(true)?
        } else {
            compute_bbox(&points)
        };

        self.glyph_buf.put_i16(n_contours as i16);
        for value in bbox {
            self.glyph_buf.put_i16(value);
        }
        for end_pt in end_pts_of_contours {
            self.glyph_buf.put_u16(end_pt);
        }
        self.glyph_buf.put_u16(instruction_size);
        self.glyph_buf.put_slice(&instructions);

        write_point_arrays(&points, &mut self.glyph_buf);
        Ok(())
    }
}

/// Component-wise min/max over the point set; all zero for no points.
fn compute_bbox(points: &[Point]) -> [i16; 4] {
    let Some(first) = points.first() else {
        return [0; 4];
    };
    let mut bbox = [first.x, first.y, first.x, first.y];
    for point in &points[1..] {
        bbox[0] = bbox[0].min(point.x);
        bbox[1] = bbox[1].min(point.y);
        bbox[2] = bbox[2].max(point.x);
        bbox[3] = bbox[3].max(point.y);
    }
    bbox
}

/// The TrueType flag byte for one point's deltas, before repeat coding.
fn point_flag(dx: i16, dy: i16, on_curve: bool) -> u8 {
    let mut flag = 0;
    if on_curve {
        flag |= ON_CURVE;
    }

    if dx == 0 {
        flag |= X_IS_SAME_OR_POSITIVE_X_SHORT;
    } else if (-255..=255).contains(&dx) {
        flag |= X_SHORT_VECTOR;
        if dx > 0 {
            flag |= X_IS_SAME_OR_POSITIVE_X_SHORT;
        }
    }

    if dy == 0 {
        flag |= Y_IS_SAME_OR_POSITIVE_Y_SHORT;
    } else if (-255..=255).contains(&dy) {
        flag |= Y_SHORT_VECTOR;
        if dy > 0 {
            flag |= Y_IS_SAME_OR_POSITIVE_Y_SHORT;
        }
    }

    flag
}

/// Write the flag array (with repeat coding) followed by the X and Y delta
/// arrays for the given absolute points.
fn write_point_arrays(points: &[Point], dst: &mut Vec<u8>) {
    fn emit(dst: &mut Vec<u8>, flag: u8, repeats: u8) {
        if repeats > 0 {
            dst.put_u8(flag | REPEAT_FLAG);
            dst.put_u8(repeats);
        } else {
            dst.put_u8(flag);
        }
    }

    // Flags. A run of equal flags collapses into one flag with REPEAT_FLAG
    // set and a one-byte count, capped at 255 repeats.
    let mut pending: Option<(u8, u8)> = None;
    let (mut last_x, mut last_y) = (0i16, 0i16);
    for point in points {
        let flag = point_flag(point.x - last_x, point.y - last_y, point.on_curve);
        last_x = point.x;
        last_y = point.y;

        pending = Some(match pending {
            Some((prev, repeats)) if prev == flag && repeats < 255 => (prev, repeats + 1),
            Some((prev, repeats)) => {
                emit(dst, prev, repeats);
                (flag, 0)
            }
            None => (flag, 0),
        });
    }
    if let Some((flag, repeats)) = pending {
        emit(dst, flag, repeats);
    }

    // X deltas: nothing when unchanged, a magnitude byte when short, a
    // signed word otherwise.
    let mut last_x = 0i16;
    for point in points {
        let dx = point.x - last_x;
        last_x = point.x;
        if dx == 0 {
            continue;
        }
        if (-255..=255).contains(&dx) {
            dst.put_u8(dx.unsigned_abs() as u8);
        } else {
            dst.put_i16(dx);
        }
    }

    // Y deltas, identically.
    let mut last_y = 0i16;
    for point in points {
        let dy = point.y - last_y;
        last_y = point.y;
        if dy == 0 {
            continue;
        }
        if (-255..=255).contains(&dy) {
            dst.put_u8(dy.unsigned_abs() as u8);
        } else {
            dst.put_i16(dy);
        }
    }
}

/// Encode `loca` offsets: `u16` halves of each offset for the short format,
/// full `u32` values otherwise.
fn generate_loca(offsets: &[u32], index_format: u16) -> Result<Vec<u8>, DecodeError> {
    let entry_size = if index_format == 0 { 2 } else { 4 };
    let mut loca = Vec::with_capacity(offsets.len() * entry_size);
    if index_format == 0 {
        for &offset in offsets {
            debug_assert!(offset % 2 == 0);
            let half = offset >> 1;
            if half > u16::MAX as u32 {
                return Err(DecodeError::Malformed(
                    "'glyf' table too large for short 'loca' offsets",
                ));
            }
            loca.put_u16(half as u16);
        }
    } else {
        for &offset in offsets {
            loca.put_u32(offset);
        }
    }
    Ok(loca)
}

fn table_offset(len: usize) -> Result<u32, DecodeError> {
    u32::try_from(len).map_err(|_| DecodeError::Malformed("'glyf' table exceeds 4 GiB"))
}

// Round up to the nearest multiple of 4, saturating rather than wrapping.
fn align4(len: usize) -> usize {
    match len.checked_add(3) {
        Some(padded) => padded & !3,
        None => len,
    }
}
