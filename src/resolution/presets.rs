//! 分辨率预设
//!
//! 各模型族的常用分辨率, 以及宽高比命名、最近预设匹配、吸附与模型约束计算。

use pyo3::pyfunction;

/// 预设
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

const fn preset(name: &'static str, width: u32, height: u32) -> Preset {
    Preset {
        name,
        width,
        height,
    }
}

/// 预设分类
#[derive(Debug, Clone, Copy)]
pub struct PresetCategory {
    pub name: &'static str,
    pub presets: &'static [Preset],
}

pub const CATEGORY_FLUX: &str = "Flux";
pub const CATEGORY_WAN: &str = "WAN";

pub const PRESET_CATEGORIES: &[PresetCategory] = &[
    PresetCategory {
        name: "Standard",
        presets: &[
            preset("1:1 Square", 512, 512),
            preset("1:2 Tall", 512, 1024),
            preset("1:3 Ultra Tall", 512, 1536),
            preset("2:3 Portrait", 512, 768),
            preset("3:4 Portrait", 576, 768),
            preset("4:5 Portrait", 512, 640),
            preset("4:7 Phone", 512, 896),
            preset("5:12 Banner", 512, 1228),
            preset("7:9 Vertical", 512, 658),
            preset("9:16 Mobile", 576, 1024),
            preset("9:21 Ultra Mobile", 512, 1194),
            preset("10:16 Monitor", 640, 1024),
            preset("13:19 Tall Screen", 512, 748),
            preset("3:2 Landscape", 768, 512),
            preset("4:3 Classic", 512, 384),
            preset("16:9 Widescreen", 768, 432),
            preset("21:9 Ultrawide", 1024, 439),
        ],
    },
    PresetCategory {
        name: "SDXL",
        presets: &[
            preset("1:1 Square", 1024, 1024),
            preset("3:4 Portrait", 768, 1024),
            preset("4:5 Portrait", 915, 1144),
            preset("5:12 Portrait", 640, 1536),
            preset("7:9 Portrait", 896, 1152),
            preset("9:16 Portrait", 768, 1344),
            preset("13:19 Portrait", 832, 1216),
            preset("3:2 Landscape", 1254, 836),
        ],
    },
    PresetCategory {
        name: CATEGORY_FLUX,
        presets: &[
            preset("1:1 Square", 1024, 1024),
            preset("2:3 Portrait", 832, 1248),
            preset("3:4 Portrait", 896, 1184),
            preset("4:5 Portrait", 928, 1152),
            preset("9:16 Portrait", 768, 1344),
            preset("9:21 Portrait", 672, 1440),
        ],
    },
    PresetCategory {
        name: CATEGORY_WAN,
        presets: &[
            preset("16:9 Landscape HD", 1280, 720),
            preset("16:9 Landscape", 832, 480),
            preset("1:1 Square 512", 512, 512),
            preset("1:1 Square 768", 768, 768),
            preset("1:1 Square", 720, 720),
            preset("2:3 Portrait", 588, 882),
            preset("3:4 Portrait", 624, 832),
            preset("9:21 Portrait", 549, 1280),
            preset("3:2 Landscape", 1080, 720),
            preset("4:3 Landscape", 960, 720),
            preset("21:9 Landscape", 1680, 720),
        ],
    },
    PresetCategory {
        name: "HiDream Dev",
        presets: &[
            preset("1:1 Square", 1024, 1024),
            preset("1:1 Square Large", 1280, 1280),
            preset("1:1 Square XL", 1536, 1536),
            preset("16:9 Landscape", 1360, 768),
            preset("3:2 Landscape", 1248, 832),
            preset("4:3 Landscape", 1168, 880),
        ],
    },
    PresetCategory {
        name: "Qwen-Image",
        presets: &[
            preset("1:1 Square (Default)", 1328, 1328),
            preset("16:9 Landscape", 1664, 928),
            preset("4:3 Landscape", 1472, 1140),
            preset("3:2 Landscape", 1584, 1056),
            preset("1:1 Test", 1024, 1024),
            preset("4:3 Test", 768, 1024),
        ],
    },
    PresetCategory {
        name: "Social Media",
        presets: &[
            preset("Instagram Square", 1080, 1080),
            preset("Instagram Portrait", 1080, 1350),
            preset("Instagram Landscape", 1080, 566),
            preset("Instagram Stories/Reels", 1080, 1920),
            preset("Instagram Profile", 320, 320),
            preset("Facebook Post", 1200, 630),
            preset("Facebook Cover Page", 820, 312),
            preset("Facebook Cover Event", 1920, 1005),
            preset("Facebook Personal Cover", 1200, 445),
            preset("Facebook Profile", 180, 180),
            preset("Facebook Stories", 1080, 1920),
            preset("Twitter Post", 1200, 675),
            preset("Twitter Header", 1500, 500),
            preset("Twitter Profile", 400, 400),
            preset("YouTube Thumbnail", 1280, 720),
            preset("YouTube Banner", 2560, 1440),
            preset("YouTube Channel Icon", 800, 800),
            preset("YouTube Shorts", 1080, 1920),
            preset("LinkedIn Post", 1200, 627),
            preset("LinkedIn Cover Profile", 1584, 396),
            preset("LinkedIn Company Logo", 300, 300),
            preset("LinkedIn Company Background", 1128, 191),
            preset("TikTok Video", 1080, 1920),
            preset("TikTok Profile", 200, 200),
            preset("Pinterest Standard Pin", 1000, 1500),
            preset("Pinterest Max Pin", 1000, 2100),
            preset("Pinterest Profile", 165, 165),
            preset("Pinterest Board Cover", 222, 150),
            preset("Snapchat Story/Ads", 1080, 1920),
            preset("Snapchat Profile", 1080, 1080),
        ],
    },
    PresetCategory {
        name: "Print",
        presets: &[
            preset("A3 Portrait", 3508, 4961),
            preset("A4 Portrait", 2480, 3508),
            preset("A4 Landscape", 3508, 2480),
            preset("A5 Portrait", 1748, 2480),
            preset("A6 Portrait", 1240, 1748),
            preset("Business Card EU", 1004, 590),
            preset("Letter Portrait", 2550, 3300),
            preset("Legal Portrait", 2550, 4200),
            preset("Tabloid", 3300, 5100),
            preset("4x6 Photo", 1200, 1800),
            preset("5x7 Photo", 1500, 2100),
            preset("8x10 Photo", 2400, 3000),
            preset("11x14 Photo", 3300, 4200),
            preset("16x20 Photo", 4800, 6000),
            preset("20x24 Photo", 6000, 7200),
        ],
    },
    PresetCategory {
        name: "Cinema",
        presets: &[
            preset("DCI 2K Flat", 1998, 1080),
            preset("DCI 2K Scope", 2048, 858),
            preset("DCI 4K Flat", 3996, 2160),
            preset("DCI 4K Scope", 4096, 1716),
            preset("DCI Full 2K", 2048, 1080),
            preset("DCI Full 4K", 4096, 2160),
            preset("IMAX Digital", 4096, 3020),
            preset("IMAX 1.90:1", 4096, 2160),
            preset("Ultra Panavision 70", 7680, 2782),
            preset("Cinerama", 7680, 2965),
            preset("Academy 1.375:1", 1378, 1000),
            preset("Academy Original", 1474, 1072),
            preset("Silent Film 1.33:1", 1440, 1080),
            preset("Silent Film Classic", 1334, 1000),
            preset("2.39:1 Anamorphic", 2048, 858),
            preset("1.85:1 Standard", 1998, 1080),
            preset("2:1 Univisium", 2048, 1024),
            preset("4:3 Academy", 1440, 1080),
            preset("1.33:1 Classic", 1436, 1080),
        ],
    },
    PresetCategory {
        name: "Display Resolutions",
        presets: &[
            preset("CIF", 352, 288),
            preset("SVGA", 800, 600),
            preset("XGA", 1024, 768),
            preset("SXGA", 1280, 1024),
            preset("WXGA", 1366, 768),
            preset("WSXGA+", 1680, 1050),
            preset("240p", 426, 240),
            preset("360p", 640, 360),
            preset("480p SD", 854, 480),
            preset("540p qHD", 960, 540),
            preset("720p HD", 1280, 720),
            preset("900p HD+", 1600, 900),
            preset("1080p Full HD", 1920, 1080),
            preset("UWFHD", 2560, 1080),
            preset("1200p WUXGA", 1920, 1200),
            preset("1440p QHD", 2560, 1440),
            preset("UWQHD", 3440, 1440),
            preset("1600p UXGA", 2560, 1600),
            preset("1800p QHD+", 3200, 1800),
            preset("4K UHD", 3840, 2160),
            preset("UW4K (5K2K)", 5120, 2160),
            preset("5K", 5120, 2880),
            preset("6K", 6016, 3384),
            preset("8K UHD", 7680, 4320),
        ],
    },
];

/// 常用宽高比, 按横向到纵向排列
const COMMON_RATIOS: &[(&str, f64)] = &[
    ("21:9", 21.0 / 9.0),
    ("16:9", 16.0 / 9.0),
    ("3:2", 3.0 / 2.0),
    ("4:3", 4.0 / 3.0),
    ("5:4", 5.0 / 4.0),
    ("1:1", 1.0),
    ("4:5", 4.0 / 5.0),
    ("3:4", 3.0 / 4.0),
    ("2:3", 2.0 / 3.0),
    ("9:16", 9.0 / 16.0),
    ("9:21", 9.0 / 21.0),
];

/// 宽高比吸附容差
const RATIO_TOLERANCE: f64 = 0.02;

/// 按名称查找分类
pub fn category(name: &str) -> Option<&'static PresetCategory> {
    PRESET_CATEGORIES.iter().find(|c| c.name == name)
}

/// 分类名称列表
#[pyfunction]
pub fn preset_categories() -> Vec<&'static str> {
    PRESET_CATEGORIES.iter().map(|c| c.name).collect()
}

/// 分类下的预设 (名称, 宽, 高)
#[pyfunction]
pub fn presets(category_name: &str) -> Vec<(&'static str, u32, u32)> {
    category(category_name)
        .map(|c| c.presets.iter().map(|p| (p.name, p.width, p.height)).collect())
        .unwrap_or_default()
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// 宽高比名称
///
/// 与常用宽高比相差小于 0.02 时使用常用名称, 否则为约分后的 "w:h"
#[pyfunction]
pub fn aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return format!("{width}:{height}");
    }

    let divisor = gcd(width, height);
    let (w, h) = (width / divisor, height / divisor);
    let ratio = w as f64 / h as f64;

    let mut closest = format!("{w}:{h}");
    let mut min_diff = f64::INFINITY;
    for (name, value) in COMMON_RATIOS {
        let diff = (ratio - value).abs();
        if diff < min_diff && diff < RATIO_TOLERANCE {
            min_diff = diff;
            closest = name.to_string();
        }
    }
    closest
}

/// 最近预设
#[derive(Debug, Clone, PartialEq)]
pub struct PresetMatch {
    /// 显示名称, 翻转方向时带 " (flipped)" 后缀
    pub name: String,
    /// 预设原名
    pub preset_name: &'static str,
    pub width: u32,
    pub height: u32,
    pub flipped: bool,
}

/// 在分类中查找与给定尺寸最接近的预设
///
/// 距离 = 宽高比差值 + 0.5 * |ln(像素数之比)|, 同时比较翻转后的方向
pub fn closest_preset(category_name: &str, width: u32, height: u32) -> Option<PresetMatch> {
    if width == 0 || height == 0 {
        return None;
    }
    let category = category(category_name)?;

    let aspect = width as f64 / height as f64;
    let pixels = width as f64 * height as f64;

    let mut best: Option<(f64, PresetMatch)> = None;
    for preset in category.presets {
        for flipped in [false, true] {
            let (w, h) = if flipped {
                (preset.height, preset.width)
            } else {
                (preset.width, preset.height)
            };
            let aspect_diff = (aspect - w as f64 / h as f64).abs();
            let pixel_diff = (pixels / (w as f64 * h as f64)).ln().abs();
            let distance = aspect_diff + pixel_diff * 0.5;

            if best.as_ref().is_none_or(|(d, _)| distance < *d) {
                let name = if flipped {
                    format!("{} (flipped)", preset.name)
                } else {
                    preset.name.to_string()
                };
                best = Some((
                    distance,
                    PresetMatch {
                        name,
                        preset_name: preset.name,
                        width: w,
                        height: h,
                        flipped,
                    },
                ));
            }
        }
    }
    best.map(|(_, m)| m)
}

/// 最近预设 (显示名称, 宽, 高)
#[pyfunction]
#[pyo3(name = "closest_preset")]
pub fn py_closest_preset(category_name: &str, width: u32, height: u32) -> Option<(String, u32, u32)> {
    closest_preset(category_name, width, height).map(|m| (m.name, m.width, m.height))
}

fn round_to(value: f64, step: u32) -> u32 {
    ((value / step as f64).round() * step as f64) as u32
}

/// 吸附到最近的 step 倍数
#[pyfunction]
pub fn snap(width: u32, height: u32, step: u32) -> (u32, u32) {
    if step == 0 {
        return (width, height);
    }
    (round_to(width as f64, step), round_to(height as f64, step))
}

/// Flux 约束: 32 对齐, 不超过 4MP, 每边限制在 320..=2560
#[pyfunction]
pub fn flux_constraints(width: u32, height: u32) -> (u32, u32) {
    let mut new_width = round_to(width as f64, 32);
    let mut new_height = round_to(height as f64, 32);

    let megapixels = (new_width as f64 * new_height as f64) / 1_000_000.0;
    if megapixels > 4.0 {
        let scale = (4.0 / megapixels).sqrt();
        new_width = round_to(new_width as f64 * scale, 32);
        new_height = round_to(new_height as f64 * scale, 32);
    }

    (new_width.clamp(320, 2560), new_height.clamp(320, 2560))
}

/// WAN 约束: 像素数限制在 182080..=1195560, 保持宽高比, 16 对齐
#[pyfunction]
pub fn wan_constraints(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let target_pixels = (width as f64 * height as f64).clamp(182_080.0, 1_195_560.0);
    let aspect = width as f64 / height as f64;
    let target_height = (target_pixels / aspect).sqrt();
    let target_width = target_height * aspect;

    (round_to(target_width, 16), round_to(target_height, 16))
}

/// 最接近的 "p" 标签, 例如 "(1080p)"
#[pyfunction]
pub fn p_label(width: u32, height: u32) -> String {
    let p = (width as f64 * height as f64 * 9.0 / 16.0).sqrt();
    format!("({}p)", p.round() as u64)
}

/// 分类专属计算, Flux/WAN 以外原样返回
#[pyfunction]
pub fn custom_calculation(category_name: &str, width: u32, height: u32) -> (u32, u32) {
    match category_name {
        CATEGORY_FLUX => flux_constraints(width, height),
        CATEGORY_WAN => wan_constraints(width, height),
        _ => (width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() -> anyhow::Result<()> {
        assert_eq!(aspect_ratio(1920, 1080), "16:9");
        assert_eq!(aspect_ratio(1024, 1024), "1:1");
        assert_eq!(aspect_ratio(768, 432), "16:9");
        // 21:9 Ultrawide 预设 1024x439 近似 21:9
        assert_eq!(aspect_ratio(1024, 439), "21:9");
        assert_eq!(aspect_ratio(1000, 333), "1000:333");
        assert_eq!(aspect_ratio(0, 512), "0:512");
        Ok(())
    }

    #[test]
    fn test_closest_preset() -> anyhow::Result<()> {
        let m = closest_preset("SDXL", 1024, 1024).expect("match");
        assert_eq!(m.name, "1:1 Square");
        assert!(!m.flipped);

        // 横向 1344x768 只能通过翻转 9:16 Portrait 匹配
        let m = closest_preset("SDXL", 1344, 768).expect("match");
        assert_eq!(m.name, "9:16 Portrait (flipped)");
        assert_eq!(m.preset_name, "9:16 Portrait");
        assert_eq!((m.width, m.height), (1344, 768));

        assert!(closest_preset("Unknown", 1024, 1024).is_none());
        assert!(closest_preset("SDXL", 0, 1024).is_none());
        Ok(())
    }

    #[test]
    fn test_snap() -> anyhow::Result<()> {
        assert_eq!(snap(500, 300, 64), (512, 320));
        assert_eq!(snap(500, 300, 0), (500, 300));
        Ok(())
    }

    #[test]
    fn test_flux_constraints() -> anyhow::Result<()> {
        assert_eq!(flux_constraints(1024, 1024), (1024, 1024));
        assert_eq!(flux_constraints(4000, 3000), (2304, 1728));
        assert_eq!(flux_constraints(100, 100), (320, 320));
        Ok(())
    }

    #[test]
    fn test_wan_constraints() -> anyhow::Result<()> {
        assert_eq!(wan_constraints(1280, 720), (1280, 720));
        // 超出上限时缩小到 1195560 像素
        let (w, h) = wan_constraints(1920, 1080);
        assert_eq!((w % 16, h % 16), (0, 0));
        assert!((w as f64 * h as f64) <= 1_195_560.0 * 1.05);
        Ok(())
    }

    #[test]
    fn test_p_label_and_custom_calculation() -> anyhow::Result<()> {
        assert_eq!(p_label(1920, 1080), "(1080p)");
        assert_eq!(p_label(1280, 720), "(720p)");
        assert_eq!(custom_calculation("Standard", 1000, 600), (1000, 600));
        assert_eq!(custom_calculation(CATEGORY_FLUX, 1000, 600), (992, 608));
        Ok(())
    }

    #[test]
    fn test_catalogue() -> anyhow::Result<()> {
        assert_eq!(preset_categories().len(), PRESET_CATEGORIES.len());
        assert!(presets("Flux").contains(&("1:1 Square", 1024, 1024)));
        assert!(presets("Missing").is_empty());

        assert_eq!(presets("Social Media").len(), 30);
        assert_eq!(presets("Print").len(), 15);
        assert_eq!(presets("Cinema").len(), 19);
        assert!(presets("Print").contains(&("A4 Portrait", 2480, 3508)));
        assert_eq!(
            preset_categories(),
            vec![
                "Standard",
                "SDXL",
                "Flux",
                "WAN",
                "HiDream Dev",
                "Qwen-Image",
                "Social Media",
                "Print",
                "Cinema",
                "Display Resolutions"
            ]
        );

        let m = closest_preset("Cinema", 4096, 1716).expect("match");
        assert_eq!(m.name, "DCI 4K Scope");
        assert_eq!(custom_calculation("Print", 2480, 3508), (2480, 3508));
        Ok(())
    }
}
