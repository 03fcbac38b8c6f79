//! Starter project layout.

use std::path::{Path, PathBuf};

use crate::output::write_output;

const FILES: &[(&str, &str)] = &[
    ("explorer.toml", EXPLORER_TOML),
    ("package.json", PACKAGE_JSON),
    ("template.html", TEMPLATE_HTML),
    ("components/navigation/Navigation.jsx", NAVIGATION_JSX),
    ("pages/index/Index.jsx", INDEX_JSX),
    ("pages/about/About.jsx", ABOUT_JSX),
];

/// Write the starter files under `root`. Existing files are kept unless
/// `overwrite` is set. Returns the files written.
pub fn scaffold(root: &Path, overwrite: bool) -> std::io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (relative, content) in FILES {
        let path = root.join(relative);
        if path.exists() && !overwrite {
            tracing::warn!("Keeping existing {}", path.display());
            continue;
        }
        write_output(&path, content.as_bytes())?;
        written.push(path);
    }
    Ok(written)
}

const EXPLORER_TOML: &str = r#"[site]
pages = "pages"
build = "build"
template = "template.html"
base_title = "Project Explorer"

[bundle]
shared = ["react", "redux", "react-redux", "react-dom"]
node_env = "production"
minify = true

[quality]
coverage_summary = "coverage/coverage-summary.json"
# test_command = ["npx", "nyc", "--reporter=json-summary", "mocha", "--require", "@babel/register"]

[quality.thresholds]
statements = 80
branches = 80
functions = 80
lines = 80

# [[quality.linters]]
# name = "js"
# command = ["npx", "eslint", "--ext", ".js,.jsx", "components", "pages", "lib"]
"#;

const PACKAGE_JSON: &str = r#"{
  "name": "project-explorer",
  "version": "0.1.0",
  "private": true,
  "dependencies": {
    "react": "^15.0.0",
    "react-dom": "^15.0.0",
    "react-redux": "^4.4.0",
    "redux": "^3.5.0"
  }
}
"#;

const TEMPLATE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="utf-8">
	<title>{{ title }}</title>
</head>
<body>
	<div id="root">{{ body }}</div>
	<script src="../shared.js"></script>
	<script src="main.js"></script>
</body>
</html>
"#;

const NAVIGATION_JSX: &str = r#"import React from 'react';

export default class Navigation extends React.Component {
	static defaultProps = { current: 'index' };
	render() {
		return (
			<nav className="navigation">
				<a href="../index/index.html">Home</a>
				<a href="../about/index.html">About</a>
			</nav>
		);
	}
}
"#;

const INDEX_JSX: &str = r#"import React from 'react';
import Navigation from '../../components/navigation/Navigation';

export default class Index extends React.Component {
	render() {
		return (
			<div>
				<Navigation current="index" />
				<h1>Project Explorer</h1>
			</div>
		);
	}
}
"#;

const ABOUT_JSX: &str = r#"import React from 'react';
import Navigation from '../../components/navigation/Navigation';

export default class About extends React.Component {
	static title = 'About';
	constructor(props) {
		super(props);
		this.state = {
			message: 'Hello!'
		};
	}
	handleChange(event) {
		this.setState({ message: event.target.value });
	}
	render() {
		return (
			<div>
				<Navigation current="about" />
				<h1>{this.state.message}</h1>
				<input type="text" value={this.state.message} onChange={this.handleChange.bind(this)} />
			</div>
		);
	}
	componentDidMount() {
		alert('this will happen in the browser');
	}
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_every_file_once() {
        let tmp = TempDir::new().unwrap();

        let first = scaffold(tmp.path(), false).unwrap();
        fs::write(tmp.path().join("template.html"), "custom").unwrap();
        let second = scaffold(tmp.path(), false).unwrap();

        assert_eq!(first.len(), FILES.len());
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(tmp.path().join("template.html")).unwrap(), "custom");
        assert!(tmp.path().join("pages/about/About.jsx").is_file());
    }

    #[test]
    fn overwrite_replaces_existing_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("template.html"), "custom").unwrap();

        scaffold(tmp.path(), true).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("template.html")).unwrap(), TEMPLATE_HTML);
    }
}
