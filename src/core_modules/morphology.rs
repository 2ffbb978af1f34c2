// Binary morphology on color masks with a square structuring element of side
// `2 * radius + 1`. Erosion and dilation are separable for a square element, so
// each runs as a horizontal pass followed by a vertical pass. The window is
// clipped at the image border, which leaves border pixels uneroded.
//
// Each pass slides a running count of foreground pixels along the line, so a
// pixel costs O(1) whatever the radius. Work is limited to the foreground
// bounding box grown by the radius; nothing outside it can change.

pub mod morphology {
    use crate::core_modules::color_segmenter::Mask;

    #[derive(Clone, Copy)]
    enum Op {
        Erode,
        Dilate,
    }

    /// Inclusive pixel rectangle.
    #[derive(Clone, Copy)]
    struct Region {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    }

    /// Foreground bounding box grown by `pad` and clipped to the mask.
    fn active_region(mask: &Mask, pad: u32) -> Option<Region> {
        let mut bounds: Option<Region> = None;
        for (i, _) in mask.data.iter().enumerate().filter(|(_, on)| **on) {
            let (x, y) = (i as u32 % mask.width, i as u32 / mask.width);
            bounds = Some(match bounds {
                None => Region { x0: x, y0: y, x1: x, y1: y },
                Some(r) => Region {
                    x0: r.x0.min(x),
                    y0: r.y0.min(y),
                    x1: r.x1.max(x),
                    y1: r.y1.max(y),
                },
            });
        }
        bounds.map(|r| Region {
            x0: r.x0.saturating_sub(pad),
            y0: r.y0.saturating_sub(pad),
            x1: (r.x1 + pad).min(mask.width - 1),
            y1: (r.y1 + pad).min(mask.height - 1),
        })
    }

    /// Runs one window over `line`, which holds positions `offset..` of an
    /// image line `full_len` long. Positions outside `line` are background.
    fn sweep(line: &[bool], offset: u32, full_len: u32, radius: u32, op: Op, out: &mut [bool]) {
        let r = radius as usize;
        let mut count = line.iter().take(r + 1).filter(|on| **on).count();
        for i in 0..line.len() {
            let pos = offset + i as u32;
            let start = pos.saturating_sub(radius);
            let end = (pos + radius).min(full_len - 1);
            let window_len = (end - start + 1) as usize;
            out[i] = match op {
                Op::Erode => count == window_len,
                Op::Dilate => count > 0,
            };

            if i + r + 1 < line.len() && line[i + r + 1] {
                count += 1;
            }
            if i >= r && line[i - r] {
                count -= 1;
            }
        }
    }

    fn pass(mask: &Mask, region: Region, radius: u32, op: Op, horizontal: bool) -> Mask {
        let mut out = Mask::new(mask.width, mask.height);
        let width = mask.width as usize;

        if horizontal {
            let (x0, x1) = (region.x0 as usize, region.x1 as usize);
            for y in region.y0 as usize..=region.y1 as usize {
                let row = y * width;
                sweep(
                    &mask.data[row + x0..=row + x1],
                    region.x0,
                    mask.width,
                    radius,
                    op,
                    &mut out.data[row + x0..=row + x1],
                );
            }
        } else {
            let len = (region.y1 - region.y0 + 1) as usize;
            let mut line = vec![false; len];
            let mut swept = vec![false; len];
            for x in region.x0 as usize..=region.x1 as usize {
                for (i, slot) in line.iter_mut().enumerate() {
                    *slot = mask.data[(region.y0 as usize + i) * width + x];
                }
                sweep(&line, region.y0, mask.height, radius, op, &mut swept);
                for (i, on) in swept.iter().enumerate() {
                    out.data[(region.y0 as usize + i) * width + x] = *on;
                }
            }
        }
        out
    }

    fn apply(mask: &Mask, radius: u32, op: Op) -> Mask {
        if radius == 0 {
            return mask.clone();
        }
        let Some(region) = active_region(mask, radius) else {
            return mask.clone();
        };
        let rows = pass(mask, region, radius, op, true);
        pass(&rows, region, radius, op, false)
    }

    pub fn erode(mask: &Mask, radius: u32) -> Mask {
        apply(mask, radius, Op::Erode)
    }

    pub fn dilate(mask: &Mask, radius: u32) -> Mask {
        apply(mask, radius, Op::Dilate)
    }

    /// Erode then dilate: removes speckles smaller than the element.
    pub fn open(mask: &Mask, radius: u32) -> Mask {
        dilate(&erode(mask, radius), radius)
    }

    /// Dilate then erode: fills gaps smaller than the element.
    pub fn close(mask: &Mask, radius: u32) -> Mask {
        erode(&dilate(mask, radius), radius)
    }

    /// Opening followed by closing, the cleanup applied to every color mask.
    pub fn clean(mask: &Mask, radius: u32) -> Mask {
        if mask.count() == 0 {
            return mask.clone();
        }
        close(&open(mask, radius), radius)
    }
}
