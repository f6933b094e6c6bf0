//! Chromium-family executable discovery.

use std::path::{Path, PathBuf};

/// Resolves the browser executable, preferring an explicit override.
///
/// Bare command names are looked up on `PATH`; absolute candidates must exist.
pub fn find_chrome_executable(override_path: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = override_path {
		return resolve_candidate(&path.to_string_lossy());
	}

	platform_candidates().iter().find_map(|candidate| resolve_candidate(candidate))
}

fn resolve_candidate(candidate: &str) -> Option<PathBuf> {
	let is_path = candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':');
	if is_path {
		let path = PathBuf::from(candidate);
		path.exists().then_some(path)
	} else {
		which::which(candidate).ok()
	}
}

fn platform_candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium",
			"chromium-browser",
			"brave-browser",
			"microsoft-edge",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/chromium",
			"/usr/bin/chromium-browser",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	}
}

fn windows_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(|key| std::env::var(key).ok().map(PathBuf::from))
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Chromium", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
	];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| {
			suffixes
				.iter()
				.map(move |suffix| suffix.iter().fold(root.clone(), |path, part| path.join(part)))
		})
		.map(|path| path.to_string_lossy().into_owned())
		.collect();

	candidates.extend(["chrome.exe", "msedge.exe", "chromium.exe"].map(str::to_string));
	candidates
}
