use std::path::Path;

use anyhow::Context;

/// Bind group layout of a material: the base colour texture and its sampler.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Model texture_bind_group_layout"),
    })
}

/// Resolves `file_name` against the page URL, so assets live next to the page that hosts the viewer.
pub fn asset_url(page: &str, file_name: &str) -> anyhow::Result<url::Url> {
    let base = url::Url::parse(page).with_context(|| format!("Invalid page URL {}", page))?;
    base.join(file_name)
        .with_context(|| format!("Cannot resolve {} against {}", file_name, page))
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<url::Url> {
    let window = web_sys::window().context("No browser window")?;
    let page = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("Page URL unavailable: {:?}", e))?;
    asset_url(&page, file_name)
}

/**
 * Reads an asset.
 *
 * Natively `file_name` is resolved against `asset_root` on disk, in the
 * browser it is fetched relative to the page URL and `asset_root` is
 * ignored.
 */
pub async fn load_binary(asset_root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let _ = asset_root;
        let url = format_url(file_name)?;
        reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Could not fetch {}", url))?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_root.join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_resolve_next_to_the_page() {
        let url = asset_url("https://host/viewer/index.html", "public/models/adamHead/adamHead.gltf").unwrap();
        assert_eq!(url.as_str(), "https://host/viewer/public/models/adamHead/adamHead.gltf");

        let url = asset_url("https://host/viewer/", "public/models/export/biwaze.gltf").unwrap();
        assert_eq!(url.as_str(), "https://host/viewer/public/models/export/biwaze.gltf");
    }

    #[test]
    fn root_pages_resolve_from_the_origin() {
        let url = asset_url("http://localhost:8080/?model=Falcon#top", "public/a.bin").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/public/a.bin");
    }

    #[test]
    fn malformed_page_url_is_an_error() {
        assert!(asset_url("not a url", "public/a.bin").is_err());
    }
}
