//! Decoding of the WOFF2 variable-length point coordinates.
//!
//! Each point of a simple glyph is one flag byte plus one to four
//! coordinate bytes. The low seven bits of the flag select a row of a fixed
//! 128-row table which fixes the total byte count, the bit widths of the X
//! and Y deltas, an additive base for each, and their signs.
//!
//! <https://www.w3.org/TR/WOFF2/#triplet_decoding>

use bytes::Buf;

use crate::error::DecodeError;

/// An absolute glyph outline point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Point {
    pub x: i16,
    pub y: i16,
    pub on_curve: bool,
}

/// One row of the coordinate triplet encoding table.
///
/// `byte_count` includes the flag byte, which lives in a different
/// sub-stream; `byte_count - 1` coordinate bytes are consumed from the glyph
/// stream.
struct TripletRow {
    byte_count: u8,
    x_bits: u8,
    y_bits: u8,
    delta_x: u16,
    delta_y: u16,
    positive_x: bool,
    positive_y: bool,
}

const fn row(
    byte_count: u8,
    x_bits: u8,
    y_bits: u8,
    delta_x: u16,
    delta_y: u16,
    positive_x: bool,
    positive_y: bool,
) -> TripletRow {
    TripletRow {
        byte_count,
        x_bits,
        y_bits,
        delta_x,
        delta_y,
        positive_x,
        positive_y,
    }
}

#[rustfmt::skip]
static TRIPLET_ENCODINGS: [TripletRow; 128] = [
    row(2,  0,  8,    0,    0,  true, false), // 0
    row(2,  0,  8,    0,    0,  true,  true), // 1
    row(2,  0,  8,    0,  256,  true, false), // 2
    row(2,  0,  8,    0,  256,  true,  true), // 3
    row(2,  0,  8,    0,  512,  true, false), // 4
    row(2,  0,  8,    0,  512,  true,  true), // 5
    row(2,  0,  8,    0,  768,  true, false), // 6
    row(2,  0,  8,    0,  768,  true,  true), // 7
    row(2,  0,  8,    0, 1024,  true, false), // 8
    row(2,  0,  8,    0, 1024,  true,  true), // 9
    row(2,  8,  0,    0,    0, false,  true), // 10
    row(2,  8,  0,    0,    0,  true,  true), // 11
    row(2,  8,  0,  256,    0, false,  true), // 12
    row(2,  8,  0,  256,    0,  true,  true), // 13
    row(2,  8,  0,  512,    0, false,  true), // 14
    row(2,  8,  0,  512,    0,  true,  true), // 15
    row(2,  8,  0,  768,    0, false,  true), // 16
    row(2,  8,  0,  768,    0,  true,  true), // 17
    row(2,  8,  0, 1024,    0, false,  true), // 18
    row(2,  8,  0, 1024,    0,  true,  true), // 19
    row(2,  4,  4,    1,    1, false, false), // 20
    row(2,  4,  4,    1,    1,  true, false), // 21
    row(2,  4,  4,    1,    1, false,  true), // 22
    row(2,  4,  4,    1,    1,  true,  true), // 23
    row(2,  4,  4,    1,   17, false, false), // 24
    row(2,  4,  4,    1,   17,  true, false), // 25
    row(2,  4,  4,    1,   17, false,  true), // 26
    row(2,  4,  4,    1,   17,  true,  true), // 27
    row(2,  4,  4,    1,   33, false, false), // 28
    row(2,  4,  4,    1,   33,  true, false), // 29
    row(2,  4,  4,    1,   33, false,  true), // 30
    row(2,  4,  4,    1,   33,  true,  true), // 31
    row(2,  4,  4,    1,   49, false, false), // 32
    row(2,  4,  4,    1,   49,  true, false), // 33
    row(2,  4,  4,    1,   49, false,  true), // 34
    row(2,  4,  4,    1,   49,  true,  true), // 35
    row(2,  4,  4,   17,    1, false, false), // 36
    row(2,  4,  4,   17,    1,  true, false), // 37
    row(2,  4,  4,   17,    1, false,  true), // 38
    row(2,  4,  4,   17,    1,  true,  true), // 39
    row(2,  4,  4,   17,   17, false, false), // 40
    row(2,  4,  4,   17,   17,  true, false), // 41
    row(2,  4,  4,   17,   17, false,  true), // 42
    row(2,  4,  4,   17,   17,  true,  true), // 43
    row(2,  4,  4,   17,   33, false, false), // 44
    row(2,  4,  4,   17,   33,  true, false), // 45
    row(2,  4,  4,   17,   33, false,  true), // 46
    row(2,  4,  4,   17,   33,  true,  true), // 47
    row(2,  4,  4,   17,   49, false, false), // 48
    row(2,  4,  4,   17,   49,  true, false), // 49
    row(2,  4,  4,   17,   49, false,  true), // 50
    row(2,  4,  4,   17,   49,  true,  true), // 51
    row(2,  4,  4,   33,    1, false, false), // 52
    row(2,  4,  4,   33,    1,  true, false), // 53
    row(2,  4,  4,   33,    1, false,  true), // 54
    row(2,  4,  4,   33,    1,  true,  true), // 55
    row(2,  4,  4,   33,   17, false, false), // 56
    row(2,  4,  4,   33,   17,  true, false), // 57
    row(2,  4,  4,   33,   17, false,  true), // 58
    row(2,  4,  4,   33,   17,  true,  true), // 59
    row(2,  4,  4,   33,   33, false, false), // 60
    row(2,  4,  4,   33,   33,  true, false), // 61
    row(2,  4,  4,   33,   33, false,  true), // 62
    row(2,  4,  4,   33,   33,  true,  true), // 63
    row(2,  4,  4,   33,   49, false, false), // 64
    row(2,  4,  4,   33,   49,  true, false), // 65
    row(2,  4,  4,   33,   49, false,  true), // 66
    row(2,  4,  4,   33,   49,  true,  true), // 67
    row(2,  4,  4,   49,    1, false, false), // 68
    row(2,  4,  4,   49,    1,  true, false), // 69
    row(2,  4,  4,   49,    1, false,  true), // 70
    row(2,  4,  4,   49,    1,  true,  true), // 71
    row(2,  4,  4,   49,   17, false, false), // 72
    row(2,  4,  4,   49,   17,  true, false), // 73
    row(2,  4,  4,   49,   17, false,  true), // 74
    row(2,  4,  4,   49,   17,  true,  true), // 75
    row(2,  4,  4,   49,   33, false, false), // 76
    row(2,  4,  4,   49,   33,  true, false), // 77
    row(2,  4,  4,   49,   33, false,  true), // 78
    row(2,  4,  4,   49,   33,  true,  true), // 79
    row(2,  4,  4,   49,   49, false, false), // 80
    row(2,  4,  4,   49,   49,  true, false), // 81
    row(2,  4,  4,   49,   49, false,  true), // 82
    row(2,  4,  4,   49,   49,  true,  true), // 83
    row(3,  8,  8,    1,    1, false, false), // 84
    row(3,  8,  8,    1,    1,  true, false), // 85
    row(3,  8,  8,    1,    1, false,  true), // 86
    row(3,  8,  8,    1,    1,  true,  true), // 87
    row(3,  8,  8,    1,  257, false, false), // 88
    row(3,  8,  8,    1,  257,  true, false), // 89
    row(3,  8,  8,    1,  257, false,  true), // 90
    row(3,  8,  8,    1,  257,  true,  true), // 91
    row(3,  8,  8,    1,  513, false, false), // 92
    row(3,  8,  8,    1,  513,  true, false), // 93
    row(3,  8,  8,    1,  513, false,  true), // 94
    row(3,  8,  8,    1,  513,  true,  true), // 95
    row(3,  8,  8,  257,    1, false, false), // 96
    row(3,  8,  8,  257,    1,  true, false), // 97
    row(3,  8,  8,  257,    1, false,  true), // 98
    row(3,  8,  8,  257,    1,  true,  true), // 99
    row(3,  8,  8,  257,  257, false, false), // 100
    row(3,  8,  8,  257,  257,  true, false), // 101
    row(3,  8,  8,  257,  257, false,  true), // 102
    row(3,  8,  8,  257,  257,  true,  true), // 103
    row(3,  8,  8,  257,  513, false, false), // 104
    row(3,  8,  8,  257,  513,  true, false), // 105
    row(3,  8,  8,  257,  513, false,  true), // 106
    row(3,  8,  8,  257,  513,  true,  true), // 107
    row(3,  8,  8,  513,    1, false, false), // 108
    row(3,  8,  8,  513,    1,  true, false), // 109
    row(3,  8,  8,  513,    1, false,  true), // 110
    row(3,  8,  8,  513,    1,  true,  true), // 111
    row(3,  8,  8,  513,  257, false, false), // 112
    row(3,  8,  8,  513,  257,  true, false), // 113
    row(3,  8,  8,  513,  257, false,  true), // 114
    row(3,  8,  8,  513,  257,  true,  true), // 115
    row(3,  8,  8,  513,  513, false, false), // 116
    row(3,  8,  8,  513,  513,  true, false), // 117
    row(3,  8,  8,  513,  513, false,  true), // 118
    row(3,  8,  8,  513,  513,  true,  true), // 119
    row(4, 12, 12,    0,    0, false, false), // 120
    row(4, 12, 12,    0,    0,  true, false), // 121
    row(4, 12, 12,    0,    0, false,  true), // 122
    row(4, 12, 12,    0,    0,  true,  true), // 123
    row(5, 16, 16,    0,    0, false, false), // 124
    row(5, 16, 16,    0,    0,  true, false), // 125
    row(5, 16, 16,    0,    0, false,  true), // 126
    row(5, 16, 16,    0,    0,  true,  true), // 127
];

/// Decode `num_points` absolute points, taking flag bytes from
/// `flag_stream` and coordinate bytes from `glyph_stream`.
pub(crate) fn decode_points(
    flag_stream: &mut impl Buf,
    glyph_stream: &mut impl Buf,
    num_points: usize,
) -> Result<Vec<Point>, DecodeError> {
    let mut points = Vec::with_capacity(num_points);
    let mut x: i16 = 0;
    let mut y: i16 = 0;

    for _ in 0..num_points {
        let flag = flag_stream.try_get_u8()?;
        let on_curve = flag & 0x80 == 0;
        let encoding = &TRIPLET_ENCODINGS[(flag & 0x7F) as usize];

        let mut coords = [0u8; 4];
        let coords = &mut coords[..(encoding.byte_count - 1) as usize];
        glyph_stream.try_copy_to_slice(coords)?;

        let (dx, dy) = extract_deltas(encoding, coords)?;
        x = x.checked_add(dx).ok_or(DecodeError::Malformed(
            "glyph point x coordinate overflows",
        ))?;
        y = y.checked_add(dy).ok_or(DecodeError::Malformed(
            "glyph point y coordinate overflows",
        ))?;

        points.push(Point { x, y, on_curve });
    }

    Ok(points)
}

fn extract_deltas(encoding: &TripletRow, coords: &[u8]) -> Result<(i16, i16), DecodeError> {
    let raw_x: i16 = match encoding.x_bits {
        0 => 0,
        4 => (coords[0] >> 4) as i16,
        8 => coords[0] as i16,
        12 => ((coords[0] as i16) << 4) | (coords[1] >> 4) as i16,
        16 => i16::from_be_bytes([coords[0], coords[1]]),
        _ => unreachable!("triplet table only holds widths 0/4/8/12/16"),
    };
    let raw_y: i16 = match encoding.y_bits {
        0 => 0,
        4 => (coords[0] & 0x0F) as i16,
        // With three total bytes X takes the first, otherwise Y reads the
        // same byte X did not use.
        8 => {
            if encoding.byte_count == 3 {
                coords[1] as i16
            } else {
                coords[0] as i16
            }
        }
        12 => (((coords[1] & 0x0F) as i16) << 8) | coords[2] as i16,
        16 => i16::from_be_bytes([coords[2], coords[3]]),
        _ => unreachable!("triplet table only holds widths 0/4/8/12/16"),
    };

    let overflow = DecodeError::Malformed("glyph point delta overflows");
    let mut dx = raw_x.checked_add_unsigned(encoding.delta_x).ok_or(overflow.clone())?;
    let mut dy = raw_y.checked_add_unsigned(encoding.delta_y).ok_or(overflow.clone())?;
    if !encoding.positive_x {
        dx = dx.checked_neg().ok_or(overflow.clone())?;
    }
    if !encoding.positive_y {
        dy = dy.checked_neg().ok_or(overflow)?;
    }
    Ok((dx, dy))
}
