pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Composite premultiplied RGBA8 over an opaque straight background, producing opaque pixels.
pub(crate) fn flatten_premul_over_bg(rgba: &mut [u8], bg: [u8; 4]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        let inv = 255 - a;
        for (c, b) in px[..3].iter_mut().zip(bg) {
            *c = (u16::from(*c) + mul_div255_u16(u16::from(b), inv)).min(255) as u8;
        }
        px[3] = 255;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
