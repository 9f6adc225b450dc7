fn main() {
    #[cfg(windows)]
    {
        use std::path::PathBuf;

        let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
            return;
        };
        let ico_path = PathBuf::from(&manifest_dir)
            .join("resources")
            .join("launcher-icon.ico");

        // ICO 파일이 없으면 아이콘 없이 빌드
        if !ico_path.exists() {
            println!(
                "cargo:warning=Icon file not found. Place launcher-icon.ico in the resources directory"
            );
            return;
        }

        if let Some(path) = ico_path.to_str() {
            let mut res = winres::WindowsResource::new();
            res.set_icon(path);
            if let Err(e) = res.compile() {
                println!("cargo:warning=Failed to compile resources: {}", e);
            }
        }
    }
}
